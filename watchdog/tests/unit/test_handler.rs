//! Deployment lifecycle and file handling through the event handler

use glider_watchdog::models::deployment::DeploymentQuery;
use glider_watchdog::storage::repository::Repository;
use glider_watchdog::watch::events::FsEvent;
use glider_watchdog::watch::handler::Outcome;

use crate::common::Fixture;

#[tokio::test]
async fn test_deployment_end_to_end() {
    let fx = Fixture::new();
    let bob = fx.add_user("bob").await;

    // directory appears
    let dir = fx.mkdir("bob/seaglider-001");
    let outcome = fx.handler.handle(&FsEvent::dir_created(&dir)).await;
    assert_eq!(
        outcome,
        Outcome::DeploymentCreated {
            deployment_dir: "bob/seaglider-001".to_string()
        }
    );

    let deployment = fx
        .repo
        .find_deployment(&DeploymentQuery::by_name("seaglider-001"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(deployment.user_id, bob.id.unwrap());
    assert_eq!(deployment.glider_name, "seaglider");
    assert!(!deployment.delayed_mode);
    assert!(!deployment.completed);

    // wmoid.txt
    let wmoid = fx.write("bob/seaglider-001/wmoid.txt", "4801234\n");
    let outcome = fx.handler.handle(&FsEvent::file_created(&wmoid)).await;
    assert_eq!(
        outcome,
        Outcome::DeploymentUpdated {
            deployment_dir: "bob/seaglider-001".to_string(),
            flagged: false
        }
    );
    assert_eq!(fx.flag_count(), 0);

    // data file
    let data = fx.write("bob/seaglider-001/seaglider-001_0001.nc", "profile");
    let outcome = fx.handler.handle(&FsEvent::file_created(&data)).await;
    assert_eq!(
        outcome,
        Outcome::DeploymentUpdated {
            deployment_dir: "bob/seaglider-001".to_string(),
            flagged: true
        }
    );
    assert!(fx.flag("seaglider-001").exists());
    assert_eq!(fx.flag_count(), 1);

    let deployment = fx
        .repo
        .find_deployment(&DeploymentQuery::by_dir("bob/seaglider-001"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(deployment.wmo_id.as_deref(), Some("4801234"));
    assert!(deployment.checksum.is_some());
    assert_eq!(deployment.latest_file.as_deref(), Some("seaglider-001_0001.nc"));

    // directory removed
    std::fs::remove_dir_all(&dir).unwrap();
    let outcome = fx.handler.handle(&FsEvent::dir_deleted(&dir)).await;
    assert_eq!(
        outcome,
        Outcome::DeploymentRemoved {
            deployment_dir: "bob/seaglider-001".to_string()
        }
    );
    assert!(fx.repo.list_deployments().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_directory_event_is_idempotent() {
    let fx = Fixture::new();
    fx.add_user("bob").await;
    let dir = fx.mkdir("bob/seaglider-001");

    fx.handler.handle(&FsEvent::dir_created(&dir)).await;
    let outcome = fx.handler.handle(&FsEvent::dir_created(&dir)).await;

    assert_eq!(
        outcome,
        Outcome::DeploymentExists {
            deployment_dir: "bob/seaglider-001".to_string()
        }
    );
    assert_eq!(fx.repo.list_deployments().await.unwrap().len(), 1);
    assert_eq!(fx.repo.deployment_saves(), 1);
}

#[tokio::test]
async fn test_directory_for_unknown_user_is_dropped() {
    let fx = Fixture::new();
    let dir = fx.mkdir("mallory/glider9");

    let outcome = fx.handler.handle(&FsEvent::dir_created(&dir)).await;

    assert!(outcome.is_dropped());
    assert!(fx.repo.list_deployments().await.unwrap().is_empty());
    assert!(fx.repo.find_user("mallory").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delayed_mode_data_is_not_flagged() {
    let fx = Fixture::new();
    fx.add_user("alice").await;
    let dir = fx.mkdir("alice/glider1-delayed");
    fx.handler.handle(&FsEvent::dir_created(&dir)).await;

    let data = fx.write("alice/glider1-delayed/glider1-delayed.nc", "profile");
    let outcome = fx.handler.handle(&FsEvent::file_created(&data)).await;

    assert_eq!(
        outcome,
        Outcome::DeploymentUpdated {
            deployment_dir: "alice/glider1-delayed".to_string(),
            flagged: false
        }
    );
    assert_eq!(fx.flag_count(), 0);

    let deployment = fx
        .repo
        .find_deployment(&DeploymentQuery::by_name("glider1-delayed"))
        .await
        .unwrap()
        .unwrap();
    assert!(deployment.delayed_mode);
    assert_eq!(deployment.latest_file.as_deref(), Some("glider1-delayed.nc"));
}

#[tokio::test]
async fn test_wmoid_is_overwritten_and_cleared() {
    let fx = Fixture::new();
    fx.add_user("bob").await;
    let dir = fx.mkdir("bob/ru29");
    fx.handler.handle(&FsEvent::dir_created(&dir)).await;

    let wmo_of = |fx: &Fixture| {
        let repo = fx.repo.clone();
        async move {
            repo.find_deployment(&DeploymentQuery::by_name("ru29"))
                .await
                .unwrap()
                .unwrap()
                .wmo_id
        }
    };

    let wmoid = fx.write("bob/ru29/wmoid.txt", "111\n");
    fx.handler.handle(&FsEvent::file_created(&wmoid)).await;
    assert_eq!(wmo_of(&fx).await.as_deref(), Some("111"));

    fx.write("bob/ru29/wmoid.txt", "  222  \nignored second line\n");
    fx.handler.handle(&FsEvent::file_modified(&wmoid)).await;
    assert_eq!(wmo_of(&fx).await.as_deref(), Some("222"));

    fx.write("bob/ru29/wmoid.txt", "");
    fx.handler.handle(&FsEvent::file_modified(&wmoid)).await;
    assert_eq!(wmo_of(&fx).await, None);
}

#[tokio::test]
async fn test_file_for_unrecorded_deployment_is_dropped() {
    let fx = Fixture::new();
    fx.mkdir("bob/ghost");
    let data = fx.write("bob/ghost/ghost.nc", "profile");

    let outcome = fx.handler.handle(&FsEvent::file_created(&data)).await;

    assert!(outcome.is_dropped());
    assert_eq!(fx.flag_count(), 0);
}

#[tokio::test]
async fn test_delete_of_unknown_directory_is_a_no_op() {
    let fx = Fixture::new();
    fx.add_user("bob").await;
    let kept = fx.mkdir("bob/seaglider-001");
    fx.handler.handle(&FsEvent::dir_created(&kept)).await;

    let outcome = fx
        .handler
        .handle(&FsEvent::dir_deleted(fx.root.join("bob/seaglider-00")))
        .await;

    assert!(matches!(outcome, Outcome::Ignored(_)));
    assert_eq!(fx.repo.list_deployments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unhandled_and_out_of_scope_files() {
    let fx = Fixture::new();
    fx.add_user("bob").await;
    let dir = fx.mkdir("bob/seaglider-001");
    fx.handler.handle(&FsEvent::dir_created(&dir)).await;
    let saves = fx.repo.deployment_saves();

    let notes = fx.write("bob/seaglider-001/notes.txt", "hello");
    assert_eq!(
        fx.handler.handle(&FsEvent::file_created(&notes)).await,
        Outcome::Ignored("unhandled file")
    );

    let top = fx.write("bob/readme.nc", "x");
    assert!(matches!(
        fx.handler.handle(&FsEvent::file_created(&top)).await,
        Outcome::Ignored(_)
    ));

    let swap = fx.write("bob/seaglider-001/.wmoid.txt.swp", "x");
    assert_eq!(
        fx.handler.handle(&FsEvent::file_created(&swap)).await,
        Outcome::Ignored("hidden path")
    );

    assert_eq!(fx.repo.deployment_saves(), saves);
}

#[tokio::test]
async fn test_extra_atts_saves_deployment() {
    let fx = Fixture::new();
    fx.add_user("bob").await;
    let dir = fx.mkdir("bob/seaglider-001");
    fx.handler.handle(&FsEvent::dir_created(&dir)).await;
    let saves = fx.repo.deployment_saves();

    let atts = fx.write("bob/seaglider-001/extra_atts.json", "{}");
    let outcome = fx.handler.handle(&FsEvent::file_modified(&atts)).await;

    assert_eq!(
        outcome,
        Outcome::DeploymentUpdated {
            deployment_dir: "bob/seaglider-001".to_string(),
            flagged: false
        }
    );
    assert_eq!(fx.repo.deployment_saves(), saves + 1);
    assert_eq!(fx.flag_count(), 0);
}

#[tokio::test]
async fn test_delete_removes_only_that_deployment() {
    let fx = Fixture::new();
    fx.add_user("bob").await;
    let gone = fx.mkdir("bob/seaglider-001");
    let kept = fx.mkdir("bob/seaglider-002");
    fx.handler.handle(&FsEvent::dir_created(&gone)).await;
    fx.handler.handle(&FsEvent::dir_created(&kept)).await;

    std::fs::remove_dir_all(&gone).unwrap();
    let outcome = fx.handler.handle(&FsEvent::dir_deleted(&gone)).await;

    assert_eq!(
        outcome,
        Outcome::DeploymentRemoved {
            deployment_dir: "bob/seaglider-001".to_string()
        }
    );
    let remaining = fx.repo.list_deployments().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].deployment_dir, "bob/seaglider-002");
}

#[tokio::test]
async fn test_realtime_data_file_touches_exactly_one_flag() {
    let fx = Fixture::new();
    fx.add_user("bob").await;
    let first = fx.mkdir("bob/seaglider-001");
    let other = fx.mkdir("bob/seaglider-002");
    fx.handler.handle(&FsEvent::dir_created(&first)).await;
    fx.handler.handle(&FsEvent::dir_created(&other)).await;

    let data = fx.write("bob/seaglider-001/p0001.nc", "profile");
    fx.handler.handle(&FsEvent::file_created(&data)).await;

    assert_eq!(fx.flag_count(), 1);
    assert!(fx.flag("seaglider-001").exists());
    assert!(!fx.flag("seaglider-002").exists());

    // the same dataset flagged again stays a single file
    fx.handler.handle(&FsEvent::file_modified(&data)).await;
    assert_eq!(fx.flag_count(), 1);
}
