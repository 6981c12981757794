//! Lossless PNG optimisation.
//!
//! A generated sprite is handed to every available optimiser backend in
//! priority order, repeatedly, until a full pass saves nothing more (or
//! `MAX_PASSES` is reached). A backend which saves nothing is not asked
//! again for the same file.
//!
//! Which backends exist on this machine is worked out once, when a
//! `Capabilities` table is built, and the table is then shared by reference
//! for the rest of the process.

mod tools;

use std::path::Path;

use crate::error::Result;

pub use tools::{default_tools, ExternalTool, ToolMode, POLL_INTERVAL};

/// Upper bound on optimisation passes per file.
pub const MAX_PASSES: usize = 3;

/// A lossless compressor.
pub trait Backend {
    /// Human-readable name, used in logs and progress output.
    fn name(&self) -> &str;

    /// Whether the backend can run on this machine.
    fn is_supported(&self) -> bool;

    /// Optimise `path` in place and return the number of bytes saved.
    ///
    /// `tick` is called periodically while the backend is working.
    fn run(&self, path: &Path, tick: &mut dyn FnMut()) -> Result<u64>;
}

/// The backends available on this machine, in priority order.
pub struct Capabilities {
    available: Vec<Box<dyn Backend>>,
}

impl Capabilities {
    /// Probe the default external tools.
    pub fn detect() -> Self {
        Self::probe(default_tools())
    }

    /// Keep the supported `candidates`, preserving their order.
    ///
    /// Each candidate is probed exactly once.
    pub fn probe(candidates: Vec<Box<dyn Backend>>) -> Self {
        let available: Vec<Box<dyn Backend>> = candidates
            .into_iter()
            .filter(|backend| {
                let supported = backend.is_supported();
                tracing::debug!(backend = backend.name(), supported, "probed optimiser");
                supported
            })
            .collect();

        Self { available }
    }

    /// A table with no backends; optimisation is always `Unavailable`.
    pub fn none() -> Self {
        Self { available: vec![] }
    }

    pub fn available(&self) -> &[Box<dyn Backend>] {
        &self.available
    }

    pub fn names(&self) -> Vec<&str> {
        self.available.iter().map(|b| b.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Result of optimising one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optimised {
    /// Total bytes saved across every pass.
    Saved(u64),
    /// No backend is installed; the file was not touched.
    Unavailable,
}

/// Progress report passed to the caller's callback.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// Current pass, starting at 1.
    pub pass: usize,
    /// Backend currently running.
    pub backend: &'a str,
    /// Bytes saved so far.
    pub saved: u64,
}

/// Drives the available backends against generated files.
#[derive(Debug)]
pub struct Optimiser<'a> {
    capabilities: &'a Capabilities,
}

impl<'a> Optimiser<'a> {
    pub fn new(capabilities: &'a Capabilities) -> Self {
        Self { capabilities }
    }

    /// Optimise `path` until no backend can improve on it.
    pub fn optimise_file(&self, path: &Path) -> Optimised {
        self.optimise_file_with_progress(path, &mut |_| {})
    }

    /// As `optimise_file`, reporting progress to `progress` as it goes.
    ///
    /// Backends which fail are logged and treated as having nothing more to
    /// offer; they never fail the build.
    pub fn optimise_file_with_progress(
        &self,
        path: &Path,
        progress: &mut dyn FnMut(Progress<'_>),
    ) -> Optimised {
        let backends = self.capabilities.available();
        if backends.is_empty() {
            return Optimised::Unavailable;
        }

        let mut exhausted = vec![false; backends.len()];
        let mut saved: u64 = 0;

        for pass in 1..=MAX_PASSES {
            let saved_before_pass = saved;

            for (index, backend) in backends.iter().enumerate() {
                if exhausted[index] {
                    continue;
                }

                let name = backend.name();
                let mut tick = || {
                    progress(Progress {
                        pass,
                        backend: name,
                        saved,
                    })
                };

                match backend.run(path, &mut tick) {
                    Ok(0) => exhausted[index] = true,
                    Ok(bytes) => saved += bytes,
                    Err(e) => {
                        tracing::warn!(backend = name, error = %e, "optimiser failed");
                        exhausted[index] = true;
                    }
                }

                progress(Progress {
                    pass,
                    backend: name,
                    saved,
                });
            }

            tracing::debug!(
                path = %path.display(),
                pass,
                saved = saved - saved_before_pass,
                "optimiser pass complete"
            );

            if saved == saved_before_pass {
                break;
            }
        }

        Optimised::Saved(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MontageError;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::fs;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// A backend which returns canned savings, then zero.
    struct Scripted {
        name: &'static str,
        supported: bool,
        savings: RefCell<VecDeque<Result<u64>>>,
        runs: Rc<Cell<usize>>,
        probes: Rc<Cell<usize>>,
    }

    impl Scripted {
        fn new(name: &'static str, savings: Vec<u64>) -> Self {
            Self {
                name,
                supported: true,
                savings: RefCell::new(savings.into_iter().map(Ok).collect()),
                runs: Rc::new(Cell::new(0)),
                probes: Rc::new(Cell::new(0)),
            }
        }

        fn failing(name: &'static str) -> Self {
            let backend = Self::new(name, vec![]);
            backend.savings.borrow_mut().push_back(Err(MontageError::Tool {
                tool: name.to_string(),
                message: "exit status: 1".to_string(),
            }));
            backend
        }

        fn unsupported(mut self) -> Self {
            self.supported = false;
            self
        }
    }

    impl Backend for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn is_supported(&self) -> bool {
            self.probes.set(self.probes.get() + 1);
            self.supported
        }

        fn run(&self, _path: &Path, tick: &mut dyn FnMut()) -> Result<u64> {
            self.runs.set(self.runs.get() + 1);
            tick();
            self.savings.borrow_mut().pop_front().unwrap_or(Ok(0))
        }
    }

    fn optimise(backends: Vec<Scripted>) -> Optimised {
        let boxed: Vec<Box<dyn Backend>> = backends
            .into_iter()
            .map(|b| Box::new(b) as Box<dyn Backend>)
            .collect();
        let capabilities = Capabilities::probe(boxed);
        Optimiser::new(&capabilities).optimise_file(Path::new("sprite.png"))
    }

    #[test]
    fn test_unavailable_without_backends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fry.png");
        fs::write(&path, b"untouched").unwrap();

        let capabilities = Capabilities::none();
        let result = Optimiser::new(&capabilities).optimise_file(&path);

        assert_eq!(result, Optimised::Unavailable);
        assert_eq!(fs::read(&path).unwrap(), b"untouched");
    }

    #[test]
    fn test_unsupported_backends_are_unavailable() {
        let result = optimise(vec![Scripted::new("a", vec![10]).unsupported()]);
        assert_eq!(result, Optimised::Unavailable);
    }

    #[test]
    fn test_probe_once_and_keep_order() {
        let a = Scripted::new("a", vec![]);
        let b = Scripted::new("b", vec![]).unsupported();
        let c = Scripted::new("c", vec![]);
        let probes = [a.probes.clone(), b.probes.clone(), c.probes.clone()];

        let capabilities = Capabilities::probe(vec![Box::new(a), Box::new(b), Box::new(c)]);
        let optimiser = Optimiser::new(&capabilities);
        optimiser.optimise_file(Path::new("one.png"));
        optimiser.optimise_file(Path::new("two.png"));

        assert_eq!(capabilities.names(), vec!["a", "c"]);
        assert!(probes.iter().all(|p| p.get() == 1));
    }

    #[test]
    fn test_accumulates_savings() {
        let result = optimise(vec![
            Scripted::new("a", vec![100, 10]),
            Scripted::new("b", vec![50, 5]),
        ]);

        // Pass 1: 150, pass 2: 15, pass 3: nothing.
        assert_eq!(result, Optimised::Saved(165));
    }

    #[test]
    fn test_exhausted_backend_not_rerun() {
        let a = Scripted::new("a", vec![0, 99]);
        let b = Scripted::new("b", vec![10, 10, 10]);
        let a_runs = a.runs.clone();
        let b_runs = b.runs.clone();

        let result = optimise(vec![a, b]);

        assert_eq!(a_runs.get(), 1);
        assert_eq!(b_runs.get(), 3);
        assert_eq!(result, Optimised::Saved(30));
    }

    #[test]
    fn test_stops_after_max_passes() {
        let a = Scripted::new("a", vec![1; 10]);
        let runs = a.runs.clone();

        let result = optimise(vec![a]);

        assert_eq!(runs.get(), MAX_PASSES);
        assert_eq!(result, Optimised::Saved(MAX_PASSES as u64));
    }

    #[test]
    fn test_stops_early_when_pass_saves_nothing() {
        let a = Scripted::new("a", vec![5]);
        let b = Scripted::new("b", vec![]);
        let a_runs = a.runs.clone();
        let b_runs = b.runs.clone();

        let result = optimise(vec![a, b]);

        // Pass 1 saves 5 (b exhausted), pass 2 saves nothing (a exhausted).
        assert_eq!(a_runs.get(), 2);
        assert_eq!(b_runs.get(), 1);
        assert_eq!(result, Optimised::Saved(5));
    }

    #[test]
    fn test_failing_backend_is_exhausted() {
        let bad = Scripted::failing("bad");
        let good = Scripted::new("good", vec![7]);
        let bad_runs = bad.runs.clone();

        let result = optimise(vec![bad, good]);

        assert_eq!(bad_runs.get(), 1);
        assert_eq!(result, Optimised::Saved(7));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let capabilities = Capabilities::probe(vec![
            Box::new(Scripted::new("a", vec![3, 2, 1])),
            Box::new(Scripted::new("b", vec![4, 0])),
        ]);

        let mut reports: Vec<(usize, u64)> = Vec::new();
        let result = Optimiser::new(&capabilities)
            .optimise_file_with_progress(Path::new("x.png"), &mut |p| reports.push((p.pass, p.saved)));

        assert_eq!(result, Optimised::Saved(10));
        assert!(!reports.is_empty());
        assert!(reports.windows(2).all(|w| w[0].0 <= w[1].0 && w[0].1 <= w[1].1));
        assert!(reports.iter().all(|(pass, _)| *pass <= MAX_PASSES));
    }
}
