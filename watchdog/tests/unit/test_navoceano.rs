//! NAVOCEANO intake normalization

use glider_watchdog::models::deployment::DeploymentQuery;
use glider_watchdog::storage::repository::Repository;
use glider_watchdog::watch::events::FsEvent;
use glider_watchdog::watch::handler::Outcome;

use crate::common::{is_symlink, Fixture};

const INTAKE: &str = "navoceano/hurricanes-unsorted-intake";

#[tokio::test]
async fn test_intake_file_is_linked_into_new_deployment() {
    let fx = Fixture::new();
    fx.add_user("navoceano").await;
    fx.mkdir(INTAKE);
    let raw = fx.write(&format!("{}/unit42_20230615T1200Z.nc", INTAKE), "raw");

    let outcome = fx.handler.handle(&FsEvent::file_created(&raw)).await;

    let link = fx
        .root
        .join("navoceano/unit42-20230615T1200/unit42-20230615T1200.nc");
    assert_eq!(
        outcome,
        Outcome::Linked {
            deployment_dir: "navoceano/unit42-20230615T1200".to_string(),
            link: link.clone(),
        }
    );
    assert!(is_symlink(&link));
    assert_eq!(std::fs::read_link(&link).unwrap(), raw);

    let deployment = fx
        .repo
        .find_deployment(&DeploymentQuery::by_name("unit42-20230615T1200"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(deployment.glider_name, "unit42");
    assert_eq!(deployment.deployment_dir, "navoceano/unit42-20230615T1200");
}

#[tokio::test]
async fn test_repeated_intake_event_keeps_existing_link() {
    let fx = Fixture::new();
    fx.add_user("navoceano").await;
    fx.mkdir(INTAKE);
    let raw = fx.write(&format!("{}/unit42_20230615T1200Z.nc", INTAKE), "raw");

    fx.handler.handle(&FsEvent::file_created(&raw)).await;
    let outcome = fx.handler.handle(&FsEvent::file_modified(&raw)).await;

    assert_eq!(outcome, Outcome::Ignored("NAVOCEANO file already linked"));
    assert_eq!(fx.repo.list_deployments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_intake_file_joins_existing_callsign_directory() {
    let fx = Fixture::new();
    fx.add_user("navoceano").await;
    fx.mkdir(INTAKE);
    fx.mkdir("navoceano/unit7-20230101T0000");
    fx.mkdir("navoceano/unit70-20230101T0000");
    let raw = fx.write(&format!("{}/unit7_20230615T1200Z.nc", INTAKE), "raw");

    let outcome = fx.handler.handle(&FsEvent::file_created(&raw)).await;

    let link = fx
        .root
        .join("navoceano/unit7-20230101T0000/unit7-20230615T1200.nc");
    assert_eq!(
        outcome,
        Outcome::Linked {
            deployment_dir: "navoceano/unit7-20230101T0000".to_string(),
            link: link.clone(),
        }
    );
    assert!(is_symlink(&link));
    assert!(!fx.root.join("navoceano/unit7-20230615T1200").exists());
}

#[tokio::test]
async fn test_unparseable_intake_file_is_dropped() {
    let fx = Fixture::new();
    fx.add_user("navoceano").await;
    fx.mkdir(INTAKE);
    let raw = fx.write(&format!("{}/badname.nc", INTAKE), "raw");

    let outcome = fx.handler.handle(&FsEvent::file_created(&raw)).await;

    assert!(outcome.is_dropped());
    assert!(fx.repo.list_deployments().await.unwrap().is_empty());
    let entries: Vec<_> = std::fs::read_dir(fx.root.join("navoceano"))
        .unwrap()
        .collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_non_netcdf_intake_file_is_skipped() {
    let fx = Fixture::new();
    fx.mkdir(INTAKE);
    let raw = fx.write(&format!("{}/unit42_20230615T1200Z.txt", INTAKE), "raw");

    let outcome = fx.handler.handle(&FsEvent::file_created(&raw)).await;

    assert_eq!(outcome, Outcome::Ignored("not a NAVOCEANO data file"));
}

#[tokio::test]
async fn test_link_without_intake_user_still_created() {
    let fx = Fixture::new();
    fx.mkdir(INTAKE);
    let raw = fx.write(&format!("{}/unit42_20230615T1200Z.nc", INTAKE), "raw");

    let outcome = fx.handler.handle(&FsEvent::file_created(&raw)).await;

    assert!(matches!(outcome, Outcome::Linked { .. }));
    assert!(fx.repo.list_deployments().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_symlink_event_updates_deployment_and_flags() {
    let fx = Fixture::new();
    fx.add_user("navoceano").await;
    fx.mkdir(INTAKE);
    let raw = fx.write(&format!("{}/unit42_20230615T1200Z.nc", INTAKE), "raw");

    let Outcome::Linked { link, .. } = fx.handler.handle(&FsEvent::file_created(&raw)).await
    else {
        panic!("intake file was not linked");
    };

    // the watcher sees the link it just created
    let outcome = fx.handler.handle(&FsEvent::file_created(&link)).await;

    assert_eq!(
        outcome,
        Outcome::DeploymentUpdated {
            deployment_dir: "navoceano/unit42-20230615T1200".to_string(),
            flagged: true
        }
    );
    assert!(fx.flag("unit42-20230615T1200").exists());

    let deployment = fx
        .repo
        .find_deployment(&DeploymentQuery::by_dir("navoceano/unit42-20230615T1200"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        deployment.latest_file.as_deref(),
        Some("unit42-20230615T1200.nc")
    );
}

#[tokio::test]
async fn test_intake_directory_itself_is_not_a_deployment() {
    let fx = Fixture::new();
    fx.add_user("navoceano").await;
    let intake = fx.mkdir(INTAKE);

    let outcome = fx.handler.handle(&FsEvent::dir_created(&intake)).await;

    assert_eq!(outcome, Outcome::Ignored("intake directory"));
    assert!(fx.repo.list_deployments().await.unwrap().is_empty());
}
