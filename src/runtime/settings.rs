use crate::config;

pub fn load_settings() -> config::Settings {
    match config::Settings::load() {
        Ok(settings) => {
            if let Err(msg) = settings.validate() {
                eprintln!("kiai: invalid config, using defaults: {msg}");
                config::Settings::default()
            } else {
                settings
            }
        }
        Err(e) => {
            // Config is optional; failures should not prevent the app from starting.
            eprintln!("kiai: failed to load config, using defaults: {e}");
            config::Settings::default()
        }
    }
}
