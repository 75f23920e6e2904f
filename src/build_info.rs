/// Version and git metadata baked in by `build.rs`.
#[derive(Copy, Clone, Debug)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_describe: &'static str,
    pub git_hash: &'static str,
}

pub const BUILD_INFO: BuildInfo = BuildInfo {
    version: env!("CARGO_PKG_VERSION"),
    git_describe: env!("GIT_DESCRIBE"),
    git_hash: env!("GIT_HASH"),
};

/// Run header for `name` with the given node count, as JSON.
pub fn report(name: &str, nodes: usize) -> String {
    format!(
        "{{\n  \"name\": \"{}\",\n  \"version\": \"{}\",\n  \"nodes\": {},\n  \"git_describe\": \"{}\",\n  \"git_hash\": \"{}\"\n}}",
        name, BUILD_INFO.version, nodes, BUILD_INFO.git_describe, BUILD_INFO.git_hash
    )
}

pub fn print_report(name: &str, nodes: usize) {
    println!("{}", report(name, nodes));
}
