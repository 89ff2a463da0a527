//! The bundle builder: fingerprint, cache lookup, compile, load, store.
//!
//! A build moves through these stages:
//!
//! ```text
//! Created -> CacheChecked -> hit  -> Linked
//!                         -> miss -> Compiling -> ok   -> Linked -> Cached
//!                                              -> fail -> Failed
//! ```
//!
//! A cached payload the runtime refuses to load is invalidated and the
//! build continues as a miss. A fresh payload is cached only after the
//! runtime has loaded it. Cache failures never fail a build.

use kiln_backend::{BackendSet, CompileRequest};
use kiln_cache::{PersistentCache, TraceOutput};
use kiln_common::{Dialect, Fingerprint, TargetId};
use kiln_config::KilnConfig;
use kiln_runtime::{Context, Device};

use crate::bundle::{ExecutableBundle, Origin};
use crate::error::BuildError;
use crate::fingerprint::fingerprint;
use crate::options::CompileOptions;
use crate::source::SourceBundle;

/// Builds source bundles into executable bundles, with persistent caching.
///
/// Holds no per-build state, so one compiler can serve any number of threads.
/// Concurrent builds of the same fingerprint may each compile; the cache's
/// atomic publish keeps readers from ever seeing a partial artifact.
pub struct KernelCompiler {
    backends: BackendSet,
    cache: PersistentCache,
}

impl KernelCompiler {
    /// Creates a compiler from a backend set and a cache.
    pub fn new(backends: BackendSet, cache: PersistentCache) -> Self {
        Self { backends, cache }
    }

    /// Creates a compiler from configuration.
    ///
    /// An unusable cache directory is logged and the compiler runs uncached.
    pub fn from_config(config: &KilnConfig, trace: TraceOutput) -> Self {
        let cache = PersistentCache::open(&config.cache, trace).unwrap_or_else(|e| {
            log::warn!("persistent cache unavailable, building without it: {e}");
            PersistentCache::disabled()
        });
        Self::new(BackendSet::from_config(&config.compiler), cache)
    }

    /// The configured backends.
    pub fn backends(&self) -> &BackendSet {
        &self.backends
    }

    /// The persistent cache.
    pub fn cache(&self) -> &PersistentCache {
        &self.cache
    }

    /// Capability query for one device: both its driver and a backend must
    /// accept `dialect`.
    pub fn supports(&self, context: &Context, device: &Device, dialect: Dialect) -> bool {
        context.supports_dialect(device, dialect) && self.backends.supports(dialect, &device.target)
    }

    /// Returns `true` if `dialect` can be built for every device of `context`.
    pub fn can_compile(&self, context: &Context, dialect: Dialect) -> bool {
        let devices = context.devices();
        !devices.is_empty() && devices.iter().all(|d| self.supports(context, d, dialect))
    }

    /// Builds `source` for every device of `context` with default options.
    pub fn build_from_source(
        &self,
        context: &Context,
        dialect: Dialect,
        source: impl Into<Vec<u8>>,
    ) -> Result<ExecutableBundle, BuildError> {
        let bundle = SourceBundle::new(context, dialect, source);
        self.build(&bundle, context.devices(), &CompileOptions::default())
    }

    /// Builds `bundle` for `devices` with explicit options.
    ///
    /// The options' log sink receives the build log before this returns:
    /// the compiler's log on success or failure, an empty log when the
    /// binary came from the cache.
    pub fn build(
        &self,
        bundle: &SourceBundle,
        devices: &[Device],
        options: &CompileOptions,
    ) -> Result<ExecutableBundle, BuildError> {
        match self.run(bundle, devices, options) {
            Ok((executable, log)) => {
                options.publish_log(&log);
                Ok(executable)
            }
            Err(err) => {
                match err.build_log() {
                    Some(log) => options.publish_log(log),
                    None => options.publish_log(&format!("error: {err}\n")),
                }
                Err(err)
            }
        }
    }

    fn run(
        &self,
        bundle: &SourceBundle,
        devices: &[Device],
        options: &CompileOptions,
    ) -> Result<(ExecutableBundle, String), BuildError> {
        let context = bundle.context();
        let dialect = bundle.dialect();
        let devices = resolve_devices(context, devices)?;

        if let Some(device) = devices.iter().find(|d| !self.supports(context, d, dialect)) {
            log::debug!("{dialect} is not supported on {}; not building", device.target);
            return Err(BuildError::UnsupportedDialect {
                dialect,
                target: device.target.clone(),
            });
        }

        let mut targets: Vec<TargetId> = devices.iter().map(|d| d.target.clone()).collect();
        targets.sort();
        let lead = &targets[0];
        let backend = self
            .backends
            .select(dialect, lead)
            .ok_or_else(|| BuildError::UnsupportedDialect {
                dialect,
                target: lead.clone(),
            })?;
        let fp = fingerprint(
            bundle.source(),
            dialect,
            &targets,
            &options.flags,
            &backend.identity(),
        );
        log::debug!("building {} bytes of {dialect} as {fp}", bundle.source().len());

        if let Some(executable) = self.load_cached(context, &devices, fp) {
            return Ok((executable, String::new()));
        }

        log::debug!("{fp}: compiling with '{}'", backend.name());
        let output = self.backends.compile(&CompileRequest {
            source: bundle.source(),
            dialect,
            target: lead,
            options: &options.flags,
        })?;

        // Only a payload the runtime accepts is published.
        let image = context.runtime().load_executable(&devices, &output.payload)?;
        if let Err(e) = self.cache.store(&fp, &output.payload) {
            log::warn!("failed to cache {fp}: {e}");
        }
        log::debug!("{fp}: linked compiled binary");
        let executable = ExecutableBundle::new(context.clone(), image, output.payload, fp, Origin::Compiled);
        Ok((executable, output.log))
    }

    /// Returns the cached bundle for `fp`, if the runtime accepts it.
    fn load_cached(&self, context: &Context, devices: &[Device], fp: Fingerprint) -> Option<ExecutableBundle> {
        let artifact = self.cache.lookup(&fp)?;
        match context.runtime().load_executable(devices, &artifact.payload) {
            Ok(image) => {
                log::debug!("{fp}: linked cached binary");
                Some(ExecutableBundle::new(context.clone(), image, artifact.payload, fp, Origin::Cache))
            }
            Err(e) => {
                log::warn!("cached binary {fp} rejected by runtime, recompiling: {e}");
                self.invalidate(fp);
                None
            }
        }
    }

    fn invalidate(&self, fp: Fingerprint) {
        if let Err(e) = self.cache.invalidate(&fp) {
            log::warn!("failed to remove cached binary {fp}: {e}");
        }
    }
}

/// Checks that `devices` is a non-empty subset of `context` and removes duplicates.
fn resolve_devices(context: &Context, devices: &[Device]) -> Result<Vec<Device>, BuildError> {
    if devices.is_empty() {
        return Err(BuildError::InvalidDevices("no devices given".to_string()));
    }
    let mut resolved: Vec<Device> = Vec::with_capacity(devices.len());
    for device in devices {
        if !context.contains(device) {
            return Err(BuildError::InvalidDevices(format!(
                "device '{}' is not part of the bundle's context",
                device.target
            )));
        }
        if !resolved.contains(device) {
            resolved.push(device.clone());
        }
    }
    Ok(resolved)
}
