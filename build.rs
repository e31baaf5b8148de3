fn main() {
    // Load .env file for WiFi and weather API configuration
    load_env_config();

    // Host builds (library + tests) must not see the ESP linker scripts
    if std::env::var_os("CARGO_FEATURE_FIRMWARE").is_some() {
        linker_be_nice();
        // make sure linkall.x is the last linker script (otherwise might cause problems with flip-link)
        println!("cargo:rustc-link-arg-bins=-Tlinkall.x");
    }
}

/// Load environment configuration from .env file
/// Environment variables take priority over .env file values
fn load_env_config() {
    use std::path::Path;

    // Tell cargo to rerun this build script if .env file changes
    println!("cargo:rerun-if-changed=.env");

    // Try to load .env file if it exists
    if Path::new(".env").exists() {
        match dotenvy::dotenv() {
            Ok(_) => println!("cargo:warning=Loaded .env file"),
            Err(e) => println!("cargo:warning=Failed to load .env file: {}", e),
        }
    }

    forward_env("WIFI_SSID", "", true);
    forward_env("WIFI_PASSWORD", "", true);
    forward_env("OPENWEATHERMAP_API_KEY", "", true);
    forward_env("OPENWEATHERMAP_LOCATION", "Dublin,IE", false);
}

/// Pass one variable through to `env!` in the crate, falling back to `default`
fn forward_env(name: &str, default: &str, secret: bool) {
    println!("cargo:rerun-if-env-changed={}", name);

    // Empty strings count as unset
    let value = std::env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string());

    println!("cargo:rustc-env={}={}", name, value);

    if value.is_empty() {
        println!("cargo:warning={} is empty", name);
    } else if secret {
        println!("cargo:warning={} configured (length: {})", name, value.len());
    } else {
        println!("cargo:warning={} configured: {}", name, value);
    }
}

fn linker_be_nice() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        let kind = &args[1];
        let what = &args[2];

        match kind.as_str() {
            "undefined-symbol" => match what.as_str() {
                "_defmt_timestamp" => {
                    eprintln!();
                    eprintln!("💡 `defmt` not found - make sure `defmt.x` is added as a linker script and you have included `use defmt_rtt as _;`");
                    eprintln!();
                }
                "_stack_start" => {
                    eprintln!();
                    eprintln!("💡 Is the linker script `linkall.x` missing?");
                    eprintln!();
                }
                "esp_wifi_preempt_enable"
                | "esp_wifi_preempt_yield_task"
                | "esp_wifi_preempt_task_create" => {
                    eprintln!();
                    eprintln!("💡 `esp-wifi` has no scheduler enabled. Make sure you have the `builtin-scheduler` feature enabled, or that you provide an external scheduler.");
                    eprintln!();
                }
                _ => (),
            },
            // we don't have anything helpful for "missing-lib" yet
            _ => {
                std::process::exit(1);
            }
        }

        std::process::exit(0);
    }

    println!(
        "cargo:rustc-link-arg-bins=--error-handling-script={}",
        std::env::current_exe().unwrap().display()
    );
}
