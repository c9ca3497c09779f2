use crate::fs_host;
use graphql_connector::{ClientFactory, ClientOptions};
use sourcing_core::{CoreError, CoreResult, SourceConfig, SourcingEngine};
use std::{
    io::{self, Write as _},
    path::PathBuf,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub(crate) enum CliCommand {
    /// Print the query documents and default variables of every operation.
    PrintQueries,
    /// Print the local type definitions as SDL.
    PrintTypes,
    /// Run a sync, keeping records and files in a directory.
    Source {
        /// Where records, files and the sync cursor are kept
        #[structopt(long, parse(from_os_str), default_value = ".sourcing")]
        out: PathBuf,
    },
}

impl CliCommand {
    /// Runs the command against the API of `config`, returning a summary for the log.
    pub(crate) async fn run(self, config: SourceConfig) -> CoreResult<String> {
        config.validate()?;

        let options = ClientOptions {
            token: config.token.clone(),
            headers: config.headers.clone(),
            timeout: config.timeout(),
        };
        let api = ClientFactory::new().client(&config.api_url, &options).await?;
        let engine = SourcingEngine::new(api, config);

        match self {
            CliCommand::PrintQueries => {
                let index = engine.load_schema().await?;
                let operations = engine.operations(&index).await;
                let mut out = io::stdout().lock();

                for operation in &operations {
                    let variables = serde_json::to_string_pretty(&operation.variables.to_json())
                        .map_err(|err| CoreError::Generic(err.into()))?;

                    let locale = operation.locale.as_deref().unwrap_or("default");

                    writeln!(out, "# {} (locale: {locale})", operation.operation_name).map_err(write_error)?;
                    writeln!(out, "{}\n", operation.full_query_document).map_err(write_error)?;
                    writeln!(out, "{}\n", operation.sync_query_document).map_err(write_error)?;
                    writeln!(out, "# variables\n{variables}\n").map_err(write_error)?;
                }

                Ok(format!("Printed {} operations.", operations.len()))
            }
            CliCommand::PrintTypes => {
                let index = engine.load_schema().await?;
                let definitions = engine.type_definitions(&index);

                writeln!(io::stdout().lock(), "{definitions}").map_err(write_error)?;

                Ok(String::from("Printed the type definitions."))
            }
            CliCommand::Source { out } => {
                let host = fs_host::open_default(&out).await?;
                let report = engine.source_nodes(&host).await?;

                tracing::info!(
                    fetched = report.fetched,
                    touched = report.touched,
                    deleted = report.deleted,
                    failed = report.failed_operations.len(),
                    cursor_advanced = report.cursor_advanced,
                    "Sync finished"
                );

                if report.is_success() {
                    Ok(format!("Sourced {} records into {}.", report.fetched, out.display()))
                } else {
                    Ok(format!(
                        "Sourced {} records into {}, with failed operations: {}.",
                        report.fetched,
                        out.display(),
                        report.failed_operations.join(", ")
                    ))
                }
            }
        }
    }
}

fn write_error(err: io::Error) -> CoreError {
    CoreError::Generic(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_defaults_its_output_directory() {
        let command = CliCommand::from_iter_safe(["sourcing-engine", "source"]).unwrap();

        match command {
            CliCommand::Source { out } => assert_eq!(out, PathBuf::from(".sourcing")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn print_commands_are_kebab_case() {
        assert!(matches!(
            CliCommand::from_iter_safe(["sourcing-engine", "print-queries"]),
            Ok(CliCommand::PrintQueries)
        ));
        assert!(matches!(
            CliCommand::from_iter_safe(["sourcing-engine", "print-types"]),
            Ok(CliCommand::PrintTypes)
        ));
    }

    #[test]
    fn invalid_configurations_fail_before_any_request() {
        let config = SourceConfig::new(url::Url::parse("ftp://localhost:1337").unwrap());

        let result = test_setup::runtime::run_with_tokio(CliCommand::PrintTypes.run(config));

        assert!(matches!(result, Err(CoreError::Configuration(_))));
    }
}
