//! Info operation - details of one extension.

use eyre::Result;
use weft_config::WeftToml;
use weft_loader::Extensions;

use crate::reports::InfoReport;

/// Execute the info operation.
pub fn info(extensions: &Extensions, project: &WeftToml, name: &str) -> Result<InfoReport> {
    let loaded = extensions.find(name)?;
    let extension = &loaded.extension;

    let pipelines = extension
        .ingest()
        .into_pipelines()
        .into_iter()
        .map(|(key, pipeline)| (key, pipeline.then_pipeline(extension.steps()).to_string()))
        .collect();

    Ok(InfoReport {
        name: loaded.qualified_name().to_string(),
        kind: loaded.kind(),
        path: loaded.identity.path.clone(),
        description: extension.description().map(str::to_string),
        settings: project
            .config()
            .settings_for(extension.name())
            .map(|settings| settings.to_string().trim_end().to_string()),
        pipelines,
    })
}
