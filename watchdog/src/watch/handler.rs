//! Event dispatch
//!
//! One [`FsEvent`] in, one [`Outcome`] out. Every failure is logged and
//! contained to the event that caused it.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::errors::WatchdogError;
use crate::flags::FlagSink;
use crate::storage::repository::Repository;
use crate::watch::classify::{Classified, DirAction, IntakeDir, PathClassifier};
use crate::watch::events::FsEvent;
use crate::watch::lifecycle::{ensure_deployment, remove_deployment, Ensured};
use crate::watch::mutation::{apply_file, Mutation};
use crate::watch::navoceano::{NavoceanoNormalizer, Normalized};

/// The effect a single event had
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    DeploymentCreated { deployment_dir: String },
    DeploymentExists { deployment_dir: String },
    DeploymentRemoved { deployment_dir: String },
    DeploymentUpdated {
        deployment_dir: String,
        flagged: bool,
    },
    Linked { deployment_dir: String, link: PathBuf },
    Ignored(&'static str),
    /// The event could not be applied; the reason was logged
    Dropped(String),
}

impl Outcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Outcome::Dropped(_))
    }
}

/// Routes classified events to the lifecycle, NAVOCEANO and file handlers
pub struct DeploymentHandler {
    classifier: PathClassifier,
    normalizer: NavoceanoNormalizer,
    repository: Arc<dyn Repository>,
    flags: FlagSink,
}

impl DeploymentHandler {
    pub fn new(
        root: impl Into<PathBuf>,
        intake: IntakeDir,
        repository: Arc<dyn Repository>,
        flags: FlagSink,
    ) -> Self {
        let root = root.into();
        Self {
            classifier: PathClassifier::new(root.clone(), intake.clone()),
            normalizer: NavoceanoNormalizer::new(root, intake),
            repository,
            flags,
        }
    }

    /// Handle one event to completion
    pub async fn handle(&self, event: &FsEvent) -> Outcome {
        let classified = self.classifier.classify(event);
        debug!(path = %event.path().display(), ?classified, "Classified event");

        match self.dispatch(classified).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(path = %event.path().display(), error = %e, "Dropping event");
                Outcome::Dropped(e.to_string())
            }
        }
    }

    async fn dispatch(&self, classified: Classified) -> Result<Outcome, WatchdogError> {
        let repo = self.repository.as_ref();

        match classified {
            Classified::Ignored(reason) => Ok(Outcome::Ignored(reason)),

            Classified::DirSignal {
                action: DirAction::Created,
                user,
                deployment,
            } => {
                info!(user = %user, deployment = %deployment, "New deployment directory");
                Ok(match ensure_deployment(repo, &user, &deployment).await? {
                    Ensured::Created(d) => Outcome::DeploymentCreated {
                        deployment_dir: d.deployment_dir,
                    },
                    Ensured::Existing(d) => Outcome::DeploymentExists {
                        deployment_dir: d.deployment_dir,
                    },
                    Ensured::MissingUser { username } => {
                        Outcome::Dropped(format!("no user '{}'", username))
                    }
                })
            }

            Classified::DirSignal {
                action: DirAction::Deleted,
                user,
                deployment,
            } => {
                let deployment_dir = format!("{}/{}", user, deployment);
                info!(deployment_dir = %deployment_dir, "Removed deployment directory");
                Ok(match remove_deployment(repo, &deployment_dir).await? {
                    Some(_) => Outcome::DeploymentRemoved { deployment_dir },
                    None => Outcome::Ignored("no deployment for removed directory"),
                })
            }

            Classified::NavoceanoFile { raw_filename, path } => {
                Ok(match self.normalizer.normalize(repo, &raw_filename, &path).await? {
                    Normalized::Skipped => Outcome::Ignored("not a NAVOCEANO data file"),
                    Normalized::Linked {
                        deployment_dir,
                        link,
                    } => Outcome::Linked {
                        deployment_dir,
                        link,
                    },
                    Normalized::AlreadyLinked { .. } => {
                        Outcome::Ignored("NAVOCEANO file already linked")
                    }
                })
            }

            Classified::DeploymentFile {
                deployment_dir,
                filename,
                path,
            } => {
                let mutation =
                    apply_file(repo, &self.flags, &deployment_dir, &filename, &path).await?;
                Ok(match mutation {
                    Mutation::UnknownDeployment => {
                        Outcome::Dropped(format!("no deployment for '{}'", deployment_dir))
                    }
                    Mutation::WmoId(_) | Mutation::ExtraAtts => Outcome::DeploymentUpdated {
                        deployment_dir,
                        flagged: false,
                    },
                    Mutation::DataFile { flagged } => Outcome::DeploymentUpdated {
                        deployment_dir,
                        flagged,
                    },
                    Mutation::Unhandled => Outcome::Ignored("unhandled file"),
                })
            }
        }
    }
}
