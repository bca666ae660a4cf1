use anyhow::{anyhow, Result};
use tracing::info;

use crate::config::Config;
use crate::converter::{Converter, SofficeConverter, WordAutomationConverter};

/// Command to report which conversion mechanisms this host offers
pub struct CheckCommand {
    config: Config,
}

impl CheckCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(&self) -> Result<()> {
        info!("🔎 Checking conversion mechanisms...");

        let primary = SofficeConverter::from_config(&self.config);
        let alternate = WordAutomationConverter::from_config(&self.config);

        print_status(&primary, &self.config.soffice_path, "primary");
        print_status(&alternate, &self.config.powershell_path, "alternate");
        println!(
            "   Conversion timeout: {}s",
            self.config.conversion_timeout.as_secs()
        );

        if !primary.is_available() {
            return Err(anyhow!(
                "LibreOffice was not found ('{}'). Install it or point SOFFICE_PATH at soffice",
                self.config.soffice_path
            ));
        }

        info!("✅ Ready to convert.");
        Ok(())
    }
}

fn print_status<C: Converter>(converter: &C, program: &str, role: &str) {
    let mark = if converter.is_available() { "✅" } else { "❌" };
    println!("{} {} ({}): {}", mark, converter.name(), role, program);
}
