use anyhow::Result;
use browser_sandbox::resolve_executable;
use navtask_kernel::settings::mask_secret;

use super::context::CliContext;

pub async fn cmd_info(ctx: &CliContext) -> Result<()> {
    let settings = ctx.settings();
    let credentials = ctx.credentials();

    println!("navtask System Information");
    println!("==========================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", option_env!("BUILD_DATE").unwrap_or("unknown"));
    println!("Git Commit: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!();

    println!("Configuration:");
    match ctx.config_path() {
        Some(path) => println!("- Config File: {}", path.display()),
        None => println!("- Config File: (defaults)"),
    }
    println!("- Environment: {}", settings.environment);
    println!("- Default Model: {}", settings.defaults.model);
    println!(
        "- Default Timeout: {}",
        humantime::format_duration(settings.default_timeout())
    );
    println!("- Load Wait: {}s", settings.defaults.load_wait_secs);
    println!("- Log Directory: {}", settings.log_dir.display());
    println!("- Sandbox Root: {}", settings.sandbox.storage_root.display());
    println!("- Headless: {}", settings.sandbox.headless);
    println!();

    println!("Credentials:");
    println!(
        "- OPENAI_API_KEY: {}",
        describe_keys(credentials.openai_api_keys())
    );
    println!(
        "- DEEPSEEK_API_KEY: {}",
        describe_keys(credentials.deepseek_api_keys())
    );
    println!(
        "- API_KEY: {}",
        credentials
            .api_key()
            .map(mask_secret)
            .unwrap_or_else(|| "not set (a random key is generated at serve time)".to_string())
    );
    println!();

    println!("Browser:");
    match resolve_executable(&settings.sandbox) {
        Ok(Some(path)) => println!("- Chrome: {}", path.display()),
        Ok(None) => println!("- Chrome: not found; set NAVTASK_CHROME"),
        Err(err) => println!("- Chrome: {err}"),
    }
    Ok(())
}

fn describe_keys(keys: &[String]) -> String {
    match keys {
        [] => "not set".to_string(),
        [one] => mask_secret(one),
        [first, rest @ ..] => format!("{} (+{} more)", mask_secret(first), rest.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_lists_are_masked() {
        assert_eq!(describe_keys(&[]), "not set");
        assert_eq!(describe_keys(&["sk-abcdef".into()]), "sk-ab...");
        assert_eq!(
            describe_keys(&["sk-abcdef".into(), "sk-2".into(), "sk-3".into()]),
            "sk-ab... (+2 more)"
        );
    }
}
