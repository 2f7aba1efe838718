//! Integration tests for stalecheck
//!
//! Exercise the resolver end to end against a temporary image tree and
//! scripted oracles; no real git or docker is invoked.

use stalecheck::{
    classify, Catalog, Config, Decision, Marker, RegistryOracle, Resolver, StalecheckError,
    StalecheckResult, TargetId, TargetKind, TargetMap, Timestamp, VcsOracle, VersionGate, ABSENT,
};

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const NS: &str = "openproblems";

/// Route resolver diagnostics through the test harness; `RUST_LOG` works
fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scripted VCS ages, keyed by image directory name
struct ScriptedVcs {
    ages: HashMap<String, Timestamp>,
    calls: AtomicUsize,
}

impl ScriptedVcs {
    fn new(ages: &[(&str, Timestamp)]) -> Arc<Self> {
        Arc::new(Self {
            ages: ages.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

impl VcsOracle for ScriptedVcs {
    fn age_of(&self, pathspec: &str) -> StalecheckResult<Timestamp> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ages
            .iter()
            .find(|(image, _)| pathspec.ends_with(&format!("/{image}/*")))
            .map(|(_, age)| *age)
            .ok_or_else(|| StalecheckError::UnknownImage(pathspec.to_string()))
    }
}

/// Scripted registry state, keyed by image name
#[derive(Clone, Copy)]
struct Artifact {
    age: Timestamp,
    local: bool,
    remote: bool,
}

struct ScriptedRegistry {
    artifacts: HashMap<String, Artifact>,
    age_calls: AtomicUsize,
    exists_calls: AtomicUsize,
}

impl ScriptedRegistry {
    fn new(artifacts: &[(&str, Artifact)]) -> Arc<Self> {
        Arc::new(Self {
            artifacts: artifacts
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            age_calls: AtomicUsize::new(0),
            exists_calls: AtomicUsize::new(0),
        })
    }

    fn artifact(&self, image: &str) -> StalecheckResult<Artifact> {
        self.artifacts
            .get(image)
            .copied()
            .ok_or_else(|| StalecheckError::UnknownImage(image.to_string()))
    }
}

impl RegistryOracle for ScriptedRegistry {
    fn age_of(&self, image: &str) -> StalecheckResult<Timestamp> {
        self.age_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.artifact(image)?.age)
    }

    fn exists(&self, image: &str, local: bool) -> StalecheckResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        let artifact = self.artifact(image)?;
        Ok(if local { artifact.local } else { artifact.remote })
    }
}

fn write_image(root: &Path, name: &str, from: &str) {
    let dir = root.join(name);
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("Dockerfile"), format!("FROM {from}\n")).unwrap();
}

/// python-base (external root) <- scanpy <- scanpy-gpu
fn chain_tree() -> (TempDir, Catalog) {
    let temp = TempDir::new().unwrap();
    write_image(temp.path(), "python-base", "python:3.11-slim");
    write_image(temp.path(), "scanpy", "openproblems/python-base:latest");
    write_image(temp.path(), "scanpy-gpu", "openproblems/scanpy");
    let catalog = Catalog::scan(temp.path()).unwrap();
    (temp, catalog)
}

mod scenarios {
    use super::*;

    #[test]
    fn fresh_recipe_stale_artifact_rebuilds() {
        init_logging();
        let (_temp, catalog) = chain_tree();
        let vcs = ScriptedVcs::new(&[("python-base", 1000)]);
        let registry = ScriptedRegistry::new(&[(
            "python-base",
            Artifact {
                age: 500,
                local: true,
                remote: false,
            },
        )]);
        let resolver = Resolver::new(catalog, NS, vcs, registry, VersionGate::closed());

        let resolution = resolver.resolve("python-base").unwrap();
        assert_eq!(resolution.decision, Decision::Rebuild);
        assert!(resolution.marker.ends_with("python-base/.docker_build"));
    }

    #[test]
    fn current_artifact_remote_only_refreshes() {
        let (_temp, catalog) = chain_tree();
        let vcs = ScriptedVcs::new(&[("python-base", 100)]);
        let registry = ScriptedRegistry::new(&[(
            "python-base",
            Artifact {
                age: 900,
                local: false,
                remote: true,
            },
        )]);
        let resolver = Resolver::new(catalog, NS, vcs, registry, VersionGate::closed());

        let resolution = resolver.resolve("python-base").unwrap();
        assert_eq!(resolution.decision, Decision::Refresh);
        assert!(resolution.marker.ends_with("python-base/.docker_update"));
    }

    #[test]
    fn artifact_absent_everywhere_is_missing_build() {
        let (_temp, catalog) = chain_tree();
        let vcs = ScriptedVcs::new(&[("python-base", 100)]);
        let registry = ScriptedRegistry::new(&[(
            "python-base",
            Artifact {
                age: ABSENT,
                local: false,
                remote: false,
            },
        )]);
        let resolver = Resolver::new(catalog, NS, vcs, registry, VersionGate::closed());

        let resolution = resolver.resolve("python-base").unwrap();
        assert_eq!(resolution.decision, Decision::MissingBuild);
        // Same marker as a rebuild, distinct decision for observability
        assert!(resolution.marker.ends_with("python-base/.docker_build"));
    }

    #[test]
    fn codebase_advance_forces_rebuild_regardless_of_ages() {
        let (_temp, catalog) = chain_tree();
        let vcs = ScriptedVcs::new(&[("python-base", 100)]);
        let registry = ScriptedRegistry::new(&[(
            "python-base",
            Artifact {
                age: 9_999_999_999,
                local: true,
                remote: true,
            },
        )]);
        let resolver = Resolver::new(catalog, NS, vcs, registry, VersionGate::open());

        let resolution = resolver.resolve("python-base").unwrap();
        assert_eq!(resolution.decision, Decision::Rebuild);
    }

    #[test]
    fn decision_table_is_deterministic() {
        let cases = [
            (1000, 500, false, true, false, Decision::Rebuild),
            (100, 900, false, false, true, Decision::Refresh),
            (100, ABSENT, false, false, false, Decision::MissingBuild),
            (100, 9_999_999_999, true, true, true, Decision::Rebuild),
        ];
        for (spec_age, reg_age, code_changed, local, remote, expected) in cases {
            for _ in 0..2 {
                assert_eq!(
                    classify(spec_age, reg_age, code_changed, local, remote),
                    expected
                );
            }
        }
    }
}

mod chain {
    use super::*;

    #[test]
    fn base_chain_change_rebuilds_descendants_only_as_needed() {
        let (_temp, catalog) = chain_tree();
        // Base recipe changed recently; descendants' own recipes are old
        let vcs = ScriptedVcs::new(&[
            ("python-base", 5000),
            ("scanpy", 100),
            ("scanpy-gpu", 100),
        ]);
        let registry = ScriptedRegistry::new(&[
            (
                "python-base",
                Artifact {
                    age: 4000,
                    local: true,
                    remote: true,
                },
            ),
            (
                "scanpy",
                Artifact {
                    age: 4000,
                    local: true,
                    remote: true,
                },
            ),
            (
                "scanpy-gpu",
                Artifact {
                    age: 6000,
                    local: true,
                    remote: true,
                },
            ),
        ]);
        let resolver = Resolver::new(catalog, NS, vcs, registry, VersionGate::closed());

        // spec_age propagates 5000 to every descendant
        assert_eq!(resolver.resolve("scanpy").unwrap().decision, Decision::Rebuild);
        // Artifact newer than the whole chain stays a refresh
        assert_eq!(
            resolver.resolve("scanpy-gpu").unwrap().decision,
            Decision::Refresh
        );
    }

    #[test]
    fn spec_age_monotonicity() {
        let (_temp, catalog) = chain_tree();
        let vcs = ScriptedVcs::new(&[
            ("python-base", 300),
            ("scanpy", 200),
            ("scanpy-gpu", 100),
        ]);
        let registry = ScriptedRegistry::new(&[]);
        let resolver = Resolver::new(catalog, NS, vcs, registry, VersionGate::closed());

        let ages = [
            resolver.spec_age("python-base").unwrap(),
            resolver.spec_age("scanpy").unwrap(),
            resolver.spec_age("scanpy-gpu").unwrap(),
        ];
        assert!(ages[1] >= ages[0]);
        assert!(ages[2] >= ages[1]);
    }

    #[test]
    fn cyclic_base_declarations_fail_fast() {
        let temp = TempDir::new().unwrap();
        write_image(temp.path(), "a", "openproblems/b");
        write_image(temp.path(), "b", "openproblems/c");
        write_image(temp.path(), "c", "openproblems/a");
        let catalog = Catalog::scan(temp.path()).unwrap();
        let vcs = ScriptedVcs::new(&[]);
        let registry = ScriptedRegistry::new(&[]);
        let resolver = Resolver::new(catalog, NS, vcs, registry, VersionGate::closed());

        let err = resolver.resolve("a").unwrap_err();
        assert!(matches!(err, StalecheckError::BaseChainCycle { .. }));
    }
}

mod memoization {
    use super::*;

    #[test]
    fn oracles_run_once_per_image_per_run() {
        let (_temp, catalog) = chain_tree();
        let vcs = ScriptedVcs::new(&[("python-base", 100)]);
        let registry = ScriptedRegistry::new(&[(
            "python-base",
            Artifact {
                age: 900,
                local: true,
                remote: false,
            },
        )]);
        let resolver = Resolver::new(
            catalog,
            NS,
            Arc::clone(&vcs) as Arc<dyn VcsOracle>,
            Arc::clone(&registry) as Arc<dyn RegistryOracle>,
            VersionGate::closed(),
        );

        let first = resolver.marker_for("python-base").unwrap();
        let second = resolver.marker_for("python-base").unwrap();
        assert_eq!(first, second);
        assert_eq!(vcs.calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.age_calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.exists_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_resolution_of_one_image_runs_oracles_once() {
        let (_temp, catalog) = chain_tree();
        let vcs = ScriptedVcs::new(&[("python-base", 100)]);
        let registry = ScriptedRegistry::new(&[(
            "python-base",
            Artifact {
                age: 900,
                local: true,
                remote: false,
            },
        )]);
        let resolver = Arc::new(Resolver::new(
            catalog,
            NS,
            Arc::clone(&vcs) as Arc<dyn VcsOracle>,
            Arc::clone(&registry) as Arc<dyn RegistryOracle>,
            VersionGate::closed(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || resolver.marker_for("python-base").unwrap())
            })
            .collect();

        let markers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(markers.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(vcs.calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.age_calls.load(Ordering::SeqCst), 1);
    }
}

mod markers {
    use super::*;

    #[test]
    fn startup_cleanup_then_resolution_names_fresh_markers() {
        let (temp, catalog) = chain_tree();
        let dir = temp.path().join("python-base");
        for marker in Marker::ALL {
            fs::write(marker.path(&dir), "").unwrap();
        }

        stalecheck::clear_markers(&catalog).unwrap();
        for marker in Marker::ALL {
            assert!(!marker.path(&dir).exists());
        }

        let vcs = ScriptedVcs::new(&[("python-base", 100)]);
        let registry = ScriptedRegistry::new(&[(
            "python-base",
            Artifact {
                age: 900,
                local: true,
                remote: false,
            },
        )]);
        let resolver = Resolver::new(catalog, NS, vcs, registry, VersionGate::closed());
        let marker = resolver.marker_for("python-base").unwrap();
        assert_eq!(marker, Marker::Update.path(&dir));
    }
}

mod end_to_end {
    use super::*;

    #[test]
    fn config_targets_drive_resolution() {
        let (temp, _) = chain_tree();
        let config_path = temp.path().join("stalecheck.toml");
        fs::write(
            &config_path,
            format!(
                r#"
                [images]
                dir = "{}"
                namespace = "openproblems"

                [[targets]]
                task = "label_projection"
                kind = "method"
                name = "logistic_regression"
                image = "scanpy"
                "#,
                temp.path().display()
            ),
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        let catalog = Catalog::scan(&config.images.dir).unwrap();
        let targets = TargetMap::from_entries(config.targets.clone(), &catalog).unwrap();

        let id = TargetId::new("label_projection", TargetKind::Method, "logistic_regression");
        let image = targets.image_for(&id).unwrap().to_string();

        let vcs = ScriptedVcs::new(&[("python-base", 100), ("scanpy", 100)]);
        let registry = ScriptedRegistry::new(&[(
            "scanpy",
            Artifact {
                age: 900,
                local: false,
                remote: true,
            },
        )]);
        let resolver = Resolver::new(
            catalog,
            config.images.namespace.clone(),
            vcs,
            registry,
            VersionGate::closed(),
        );

        let marker = resolver.marker_for(&image).unwrap();
        assert!(marker.ends_with("scanpy/.docker_update"));
    }

    #[test]
    fn requirements_watch_set_spans_ancestors() {
        let (temp, catalog) = chain_tree();
        fs::write(
            temp.path().join("python-base").join("requirements.txt"),
            "numpy\n",
        )
        .unwrap();
        let vcs = ScriptedVcs::new(&[
            ("python-base", 100),
            ("scanpy", 100),
            ("scanpy-gpu", 100),
        ]);
        let registry = ScriptedRegistry::new(&[
            (
                "python-base",
                Artifact {
                    age: 900,
                    local: true,
                    remote: false,
                },
            ),
            (
                "scanpy",
                Artifact {
                    age: 900,
                    local: true,
                    remote: false,
                },
            ),
        ]);
        let resolver = Resolver::new(catalog, NS, vcs, registry, VersionGate::closed());

        let files = resolver.requirements("scanpy-gpu", false).unwrap();
        assert!(files.iter().any(|p| p.ends_with("scanpy-gpu/Dockerfile")));
        assert!(files.iter().any(|p| p.ends_with("scanpy/Dockerfile")));
        assert!(files.iter().any(|p| p.ends_with("scanpy/.docker_update")));
        assert!(files.iter().any(|p| p.ends_with("python-base/Dockerfile")));
        assert!(files
            .iter()
            .any(|p| p.ends_with("python-base/requirements.txt")));
    }
}
