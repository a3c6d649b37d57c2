//! Describe command handler

use super::utils::{find_model, load_models};
use crate::cli::DescribeArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use schemabridge_core::{SchemaDescription, SchemaRegistry};
use tracing::{info, instrument};

/// Handle the describe command
#[instrument(skip(config, output), fields(models = %args.models.display()))]
pub fn handle_describe(args: DescribeArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let models = load_models(&args.models)?;
    let registry = SchemaRegistry::with_settings(config.settings.clone());

    let targets = match &args.model {
        Some(name) => vec![find_model(&models, name)?],
        None => models.derived().collect(),
    };

    let descriptions = {
        let _timer = Timer::new("compile_schemas");
        targets
            .into_iter()
            .map(|model| registry.get_or_build(model).map(|schema| schema.describe()))
            .collect::<std::result::Result<Vec<SchemaDescription>, _>>()?
    };
    info!(schemas = descriptions.len(), cached = registry.len(), "Schemas compiled");

    if descriptions.is_empty() {
        output.info("The document declares no derived models")?;
        return Ok(());
    }
    output.schemas(&descriptions)
}
