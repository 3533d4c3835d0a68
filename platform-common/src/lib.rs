pub mod mysql;
pub mod shutdown;

pub mod annotations {
    pub const STABLE_ID: &str = "platform.example.io/stable-id";
    pub const CREATED_BY: &str = "platform.example.io/created-by";
    pub const SPEC_HASH: &str = "platform.example.io/spec-hash";
}

pub fn signal_ready() {
    let _ = std::fs::write("/etc/ready", "ready");
}

pub fn init() {
    let disable_colors = ["1", "true"].contains(
        &std::env::var("DISABLE_COLORS")
            .unwrap_or_else(|_| String::new())
            .to_lowercase()
            .as_str(),
    );
    owo_colors::set_override(!disable_colors);

    install_rustls_provider();
}

pub fn install_rustls_provider() {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("install aws-lc-rs provider");
}
