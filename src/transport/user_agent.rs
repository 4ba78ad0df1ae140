const SDK_TAG: &str = "vonage-rust-sdk";
const LANG_TAG: &str = "rust";

/// `vonage-rust-sdk/<version> rust/<rust-version>[ <app-name>/<app-version>]`
///
/// `<rust-version>` is the compiler that built this crate.
pub fn default_user_agent(app: Option<(&str, &str)>) -> String {
    let mut user_agent = format!(
        "{SDK_TAG}/{} {LANG_TAG}/{}",
        env!("CARGO_PKG_VERSION"),
        env!("VONAGE_RUSTC_VERSION"),
    );
    if let Some((name, version)) = app {
        user_agent.push_str(&format!(" {name}/{version}"));
    }
    user_agent
}

/// Append `token` to `user_agent`, separated by a single space.
pub fn append_user_agent(user_agent: &mut String, token: &str) {
    user_agent.push(' ');
    user_agent.push_str(token);
}
