//! The content fingerprint that keys the persistent cache.

use kiln_common::{Dialect, Fingerprint, FingerprintHasher, TargetId};

/// Domain tag mixed into every fingerprint. Bump when the key layout changes.
const DOMAIN: &str = "kiln.kernel_compiler.v2";

/// A new kiln release may generate different code for the same input.
const KILN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Derives the cache key for one build.
///
/// Targets form a set: their order and duplicates do not matter. Options
/// keep their order, since later flags can override earlier ones.
/// `compiler` is the selected backend's identity.
pub fn fingerprint(
    source: &[u8],
    dialect: Dialect,
    targets: &[TargetId],
    options: &[String],
    compiler: &str,
) -> Fingerprint {
    let mut targets: Vec<&TargetId> = targets.iter().collect();
    targets.sort();
    targets.dedup();

    let mut hasher = FingerprintHasher::new(DOMAIN);
    hasher.write_field(source).write_str(dialect.name());
    hasher.write_len(targets.len());
    for target in targets {
        hasher
            .write_str(&target.backend)
            .write_str(&target.device)
            .write_str(&target.driver_version);
    }
    hasher.write_len(options.len());
    for option in options {
        hasher.write_str(option);
    }
    hasher.write_str(compiler).write_str(KILN_VERSION);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &[u8] = b"__kernel void k(__global int* d) { d[0] = 1; }";

    fn cpu() -> TargetId {
        TargetId::new("opencl", "cpu", "1.0")
    }

    fn gpu() -> TargetId {
        TargetId::new("opencl", "gpu", "1.0")
    }

    fn opts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_inputs_agree() {
        let a = fingerprint(SRC, Dialect::OpenCl, &[cpu()], &opts(&["-w"]), "frontend");
        let b = fingerprint(SRC, Dialect::OpenCl, &[cpu()], &opts(&["-w"]), "frontend");
        assert_eq!(a, b);
    }

    #[test]
    fn every_field_matters() {
        let base = fingerprint(SRC, Dialect::OpenCl, &[cpu()], &[], "frontend");
        assert_ne!(base, fingerprint(b"__kernel void k() {}", Dialect::OpenCl, &[cpu()], &[], "frontend"));
        assert_ne!(base, fingerprint(SRC, Dialect::Spirv, &[cpu()], &[], "frontend"));
        assert_ne!(base, fingerprint(SRC, Dialect::OpenCl, &[gpu()], &[], "frontend"));
        assert_ne!(base, fingerprint(SRC, Dialect::OpenCl, &[cpu()], &opts(&["-w"]), "frontend"));
        let newer = TargetId::new("opencl", "cpu", "1.1");
        assert_ne!(base, fingerprint(SRC, Dialect::OpenCl, &[newer], &[], "frontend"));
    }

    #[test]
    fn target_order_and_duplicates_ignored() {
        let a = fingerprint(SRC, Dialect::OpenCl, &[cpu(), gpu()], &[], "frontend");
        let b = fingerprint(SRC, Dialect::OpenCl, &[gpu(), cpu(), gpu()], &[], "frontend");
        assert_eq!(a, b);
    }

    #[test]
    fn option_order_matters() {
        let a = fingerprint(SRC, Dialect::OpenCl, &[cpu()], &opts(&["-DA=1", "-DA=2"]), "frontend");
        let b = fingerprint(SRC, Dialect::OpenCl, &[cpu()], &opts(&["-DA=2", "-DA=1"]), "frontend");
        assert_ne!(a, b);
    }

    #[test]
    fn compiler_identity_matters() {
        let frontend = fingerprint(SRC, Dialect::OpenCl, &[cpu()], &[], "frontend");
        let toolchain = fingerprint(SRC, Dialect::OpenCl, &[cpu()], &[], "toolchain:clang -c {input}");
        assert_ne!(frontend, toolchain);
    }

    #[test]
    fn option_boundaries_do_not_alias() {
        let a = fingerprint(SRC, Dialect::OpenCl, &[cpu()], &opts(&["-D", "X"]), "frontend");
        let b = fingerprint(SRC, Dialect::OpenCl, &[cpu()], &opts(&["-DX"]), "frontend");
        assert_ne!(a, b);
    }
}
