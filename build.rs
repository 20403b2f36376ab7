use std::fs;

// Release tooling reads VERSION; keep it and the package version in lockstep.
fn main() {
    println!("cargo:rerun-if-changed=VERSION");

    let pinned = match fs::read_to_string("VERSION") {
        Ok(contents) => contents.trim().to_string(),
        Err(e) => panic!("Version check failed: cannot read VERSION: {}", e),
    };
    let package = env!("CARGO_PKG_VERSION");

    if pinned != package {
        panic!(
            "Version check failed: VERSION pins {} but the package is {}",
            pinned, package
        );
    }
}
