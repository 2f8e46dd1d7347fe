//! `catalog-loadtest init` command implementation.

use anyhow::Result;

use catalog_loadtest::loadtest::config::{LoadTestConfig, ScenarioKind, WaitTime};

/// Create `.loadtest/<scenario>.toml` in the current directory, filled with
/// the scenario preset.
pub fn execute_init(scenario: ScenarioKind, force: bool) -> Result<()> {
    let config_dir = std::env::current_dir()?.join(".loadtest");
    let config_path = config_dir.join(format!("{scenario}.toml"));

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}\n\
             Use `--force` to overwrite.",
            config_path.display()
        );
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, starter_template(scenario))?;
    eprintln!("Created {}", config_path.display());
    eprintln!("Edit the file to customize the {scenario} load test.");

    Ok(())
}

/// Starter TOML for a scenario, with every preset value written out.
fn starter_template(scenario: ScenarioKind) -> String {
    let preset = LoadTestConfig::preset(scenario);
    let s = &preset.settings;

    let mut out = format!(
        "# catalog-loadtest config for the `{scenario}` scenario.\n\
         # Every key is optional; omitted keys keep the built-in preset.\n\
         # The target host comes from --host or LOCUST_HOST, not this file.\n\
         \n\
         [settings]\n\
         virtual_users = {}\n\
         duration_secs = {}\n\
         timeout_ms = {}\n\
         expected_interval_ms = {}\n\
         \n\
         [wait]\n",
        s.virtual_users, s.duration_secs, s.timeout_ms, s.expected_interval_ms
    );
    match preset.wait {
        WaitTime::Constant { secs } => {
            out.push_str(&format!("type = \"constant\"\nsecs = {secs:?}\n"));
        },
        WaitTime::Between { min_secs, max_secs } => {
            out.push_str(&format!(
                "type = \"between\"\nmin_secs = {min_secs:?}\nmax_secs = {max_secs:?}\n"
            ));
        },
    }

    match scenario {
        ScenarioKind::Search => {
            let search = &preset.search;
            // A JSON array of strings is also a valid TOML inline array.
            let queries =
                serde_json::to_string(&search.queries).unwrap_or_else(|_| "[]".to_string());
            out.push_str(&format!(
                "\n[search]\n\
                 queries = {queries}\n\
                 limit = {}\n\
                 expected_checked = {}\n",
                search.limit, search.expected_checked
            ));
        },
        ScenarioKind::Catalog => {
            let ids = &preset.catalog.ids;
            out.push_str(&format!(
                "\n# Sentinel ids, each mapped to one documented server behaviour.\n\
                 [catalog.ids]\n\
                 existing = {}\n\
                 missing = {}\n\
                 read_fault = {}\n\
                 write_fault = {}\n",
                ids.existing, ids.missing, ids.read_fault, ids.write_fault
            ));
        },
    }
    out
}
