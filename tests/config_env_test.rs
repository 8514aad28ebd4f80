use dirwatch::Settings;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

// Environment variables are process-wide, so every case that sets them
// lives in this one test.
#[test]
fn test_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        "[watch]\ndir = \"/from/file\"\npattern = \"file\"\n",
    )
    .unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("DIRWATCH_WATCH__PATTERN", r"dev\d+");
        env::set_var("DIRWATCH_LOGGING__DEFAULT", "debug");
        env::set_var("DIRWATCH_WATCH__CHANNEL_CAPACITY", "12");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    // Environment wins over the file
    assert_eq!(settings.watch.pattern, r"dev\d+");
    assert_eq!(settings.logging.default, "debug");
    assert_eq!(settings.watch.channel_capacity, 12);
    // File value kept where no env var is set
    assert_eq!(settings.watch.dir, PathBuf::from("/from/file"));

    // Patterns that look like arrays, numbers or booleans stay text
    for pattern in ["[tv]", "1", "true", "[0-9]+", "dev[0-9]"] {
        unsafe {
            env::set_var("DIRWATCH_WATCH__PATTERN", pattern);
        }
        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.watch.pattern, pattern);
    }

    unsafe {
        env::set_var("DIRWATCH_WATCH__DIR", "42");
    }
    let settings = Settings::load_from(&config_path).unwrap();
    assert_eq!(settings.watch.dir, PathBuf::from("42"));

    unsafe {
        env::remove_var("DIRWATCH_WATCH__PATTERN");
        env::remove_var("DIRWATCH_WATCH__DIR");
        env::remove_var("DIRWATCH_LOGGING__DEFAULT");
        env::remove_var("DIRWATCH_WATCH__CHANNEL_CAPACITY");
    }
}
