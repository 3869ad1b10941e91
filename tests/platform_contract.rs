use enuma_install::platform::{Identified, Platform, identify};

const SUPPORTED: &[(&str, &str, &str)] = &[
    ("linux", "x86_64", "x86_64-unknown-linux-gnu"),
    ("linux", "aarch64", "aarch64-unknown-linux-gnu"),
    ("linux", "armv7", "armv7-unknown-linux-gnueabihf"),
    ("macos", "x86_64", "x86_64-apple-darwin"),
    ("macos", "arm64", "aarch64-apple-darwin"),
    ("windows", "x64", "x86_64-pc-windows-msvc"),
    ("windows", "arm64", "aarch64-pc-windows-msvc"),
];

#[test]
fn test_supported_pairs_map_to_documented_triples() {
    for (os, arch, triple) in SUPPORTED {
        match identify(os, arch) {
            Identified::Supported(found) => assert_eq!(found.as_str(), *triple, "{}-{}", os, arch),
            Identified::Unsupported => panic!("{}-{} should be supported", os, arch),
        }
    }
}

#[test]
fn test_pairs_outside_the_table_are_unsupported() {
    let unsupported = [
        ("linux", "x86"),
        ("linux", "riscv64"),
        ("linux", "powerpc64"),
        ("macos", "x86"),
        ("windows", "x86"),
        ("freebsd", "x86_64"),
        ("android", "aarch64"),
        ("", ""),
    ];

    for (os, arch) in unsupported {
        assert_eq!(identify(os, arch), Identified::Unsupported, "{}-{}", os, arch);
        assert!(Platform::from_parts(os, arch).is_err());
    }
}

#[test]
fn test_posix_platforms_use_tarballs() {
    for (os, arch) in [("linux", "x86_64"), ("macos", "aarch64")] {
        let platform = Platform::from_parts(os, arch).unwrap();
        assert_eq!(platform.archive_ext(), "tar.gz");
        assert_eq!(platform.executable_name("enuma"), "enuma");
        assert!(!platform.is_windows());
    }
}

#[test]
fn test_current_host_is_detected_or_rejected_cleanly() {
    match Platform::detect() {
        Ok(platform) => assert!(!platform.triple.as_str().is_empty()),
        Err(e) => assert!(e.to_string().starts_with("unsupported platform")),
    }
}
