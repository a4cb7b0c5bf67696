//! Deployment updates for files appearing inside a deployment directory

use std::path::Path;

use tracing::{error, info, warn};

use crate::errors::WatchdogError;
use crate::filesys::file::File;
use crate::flags::FlagSink;
use crate::models::deployment::DeploymentQuery;
use crate::storage::checksum::is_data_file;
use crate::storage::repository::Repository;

/// Control file holding the deployment's WMO identifier
pub const WMOID_FILE: &str = "wmoid.txt";

/// Metadata overrides consumed by the catalog builder
pub const EXTRA_ATTS_FILE: &str = "extra_atts.json";

/// What a deployment file event changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// No deployment is recorded for the directory
    UnknownDeployment,
    /// WMO ID set from `wmoid.txt`
    WmoId(Option<String>),
    /// Saved because `extra_atts.json` changed
    ExtraAtts,
    /// Saved for a data file; `flagged` when ERDDAP was asked to reload
    DataFile { flagged: bool },
    /// Not a file the watcher cares about
    Unhandled,
}

/// Apply the effect of `filename` (at `path`) on the deployment in `deployment_dir`
pub async fn apply_file(
    repo: &dyn Repository,
    flags: &FlagSink,
    deployment_dir: &str,
    filename: &str,
    path: &Path,
) -> Result<Mutation, WatchdogError> {
    let Some(mut deployment) = repo
        .find_deployment(&DeploymentQuery::by_dir(deployment_dir))
        .await?
    else {
        error!(deployment_dir, "Cannot find deployment");
        return Ok(Mutation::UnknownDeployment);
    };

    match filename {
        WMOID_FILE => {
            info!(deployment_dir, "New wmoid.txt");
            let line = File::new(path).read_first_line().await?;
            // blank first line clears the ID, never stored as ""
            let wmo_id = Some(line.trim().to_string()).filter(|id| !id.is_empty());

            if let Some(previous) = &deployment.wmo_id {
                info!(
                    deployment_dir,
                    previous = %previous,
                    "Deployment already has a WMO ID, updating value with new file"
                );
            }
            if wmo_id.is_none() {
                warn!(deployment_dir, "Empty wmoid.txt, clearing WMO ID");
            }

            deployment.wmo_id = wmo_id.clone();
            repo.save_deployment(&mut deployment).await?;
            info!(deployment_dir, wmo_id = ?deployment.wmo_id, "Updated deployment");
            Ok(Mutation::WmoId(wmo_id))
        }
        EXTRA_ATTS_FILE => {
            info!(deployment_dir, "extra_atts.json changed");
            repo.save_deployment(&mut deployment).await?;
            Ok(Mutation::ExtraAtts)
        }
        _ if is_data_file(filename) => {
            repo.save_deployment(&mut deployment).await?;
            info!(deployment_dir, file = filename, "Updated deployment");

            // realtime datasets only
            if deployment.delayed_mode {
                return Ok(Mutation::DataFile { flagged: false });
            }
            flags.touch(deployment.dataset_id()).await?;
            Ok(Mutation::DataFile { flagged: true })
        }
        _ => Ok(Mutation::Unhandled),
    }
}
