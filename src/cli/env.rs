use colored::Colorize;

use crate::error::Result;
use crate::models::StripeEnvironment;
use crate::settings::{load_settings, save_settings, Settings};

fn key_state(env: StripeEnvironment) -> String {
    let var = Settings::api_key_var(env);
    if Settings::resolve_api_key(env).is_ok() {
        format!("{var} is set").green().to_string()
    } else {
        format!("{var} is not set").yellow().to_string()
    }
}

pub fn show() -> Result<()> {
    let settings = load_settings();
    println!("Environment: {}", settings.stripe_environment.as_str().bold());
    println!("Secret key:  {}", key_state(settings.stripe_environment));
    if let Some(base) = &settings.stripe_api_base {
        println!("API base:    {base}");
    }
    Ok(())
}

pub fn set(env: StripeEnvironment) -> Result<()> {
    let mut settings = load_settings();
    settings.stripe_environment = env;
    save_settings(&settings)?;
    println!("Switched to the {env} environment");
    println!("Secret key:  {}", key_state(env));
    Ok(())
}
