// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#[cfg(feature = "layout-check")]
fn bind(path: &std::path::Path) {
    bindgen::Builder::default()
        .header("src/fabric.h")
        .detect_include_paths(true)
        .prepend_enum_name(false)
        .generate_comments(false)
        .derive_copy(true)
        .derive_debug(true)
        .allowlist_type("fi_info")
        .allowlist_type("fi_fabric_attr")
        .allowlist_type("fi_domain_attr")
        .allowlist_var("FI_FORMAT_UNSPEC|FI_SOCKADDR_IN|FI_ADDR_PSMX2")
        .generate()
        .expect("Unable to generate bindings")
        .write_to_file(path.join("generated.rs"))
        .expect("Couldn't write bindings!");
}

fn main() {
    #[cfg(feature = "layout-check")]
    {
        let out_path = std::path::PathBuf::from(
            std::env::var("OUT_DIR").expect("cargo always sets OUT_DIR for build scripts"),
        );
        bind(&out_path);
        println!("cargo:rerun-if-changed=src/fabric.h");
    }

    // re-run build.rs upon changes
    println!("cargo:rerun-if-changed=build.rs");
}
