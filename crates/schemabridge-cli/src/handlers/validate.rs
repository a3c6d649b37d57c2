//! Validate command handler

use super::utils::{find_model, load_data, load_models};
use crate::cli::ValidateArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::{OutputWriter, ValidationReport};
use schemabridge_core::{ConfigBundle, SchemaRegistry, Settings, ValidationFailure};
use tracing::{info, instrument, warn};

/// Handle the validate command
///
/// Returns [`Error::ValidationFailed`] after writing the report when the data
/// is rejected.
#[instrument(skip(config, output), fields(model = %args.model, data = %args.data.display()))]
pub fn handle_validate(args: ValidateArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let models = load_models(&args.models)?;
    let model = find_model(&models, &args.model)?;
    let data = load_data(&args.data)?;

    let registry = SchemaRegistry::with_settings(settings_for(&args, &config.settings));
    let schema = registry.get_or_build(model)?;
    for warning in schema.warnings() {
        output.warning(&format!("{}: {}", warning.field, warning.message))?;
    }

    let mut bound = schema.bind(data);
    let outcome = {
        let _timer = Timer::with_details("validate_data", &args.model);
        bound.is_valid(false)
    };

    let report = match outcome {
        Ok(true) => ValidationReport {
            model: args.model.clone(),
            valid: true,
            state: bound.state(),
            data: bound.output(),
            errors: None,
            source_errors: None,
        },
        Ok(false) | Err(ValidationFailure::Invalid(_)) => ValidationReport {
            model: args.model.clone(),
            valid: false,
            state: bound.state(),
            data: None,
            errors: bound.errors().map(|errors| errors.to_json()),
            source_errors: None,
        },
        Err(ValidationFailure::Source(err)) => ValidationReport {
            model: args.model.clone(),
            valid: false,
            state: bound.state(),
            data: None,
            errors: None,
            source_errors: Some(err.errors().to_vec()),
        },
    };

    output.report(&report)?;
    if report.valid {
        info!(state = %report.state, "Data accepted");
        Ok(())
    } else {
        warn!(state = %report.state, "Data rejected");
        Err(Error::ValidationFailed { model: args.model })
    }
}

/// Settings with the command-line overrides applied to the default bundle
///
/// Models that set a key explicitly keep their own value.
fn settings_for(args: &ValidateArgs, base: &Settings) -> Settings {
    let mut defaults: ConfigBundle = base.default_config;
    if args.validate_source {
        defaults.validate_against_source = true;
    }
    if let Some(authority) = args.authority {
        defaults.error_authority = authority.into();
    }
    if args.no_backpopulate {
        defaults.backpopulate = false;
    }
    base.clone().with_default_config(defaults)
}
