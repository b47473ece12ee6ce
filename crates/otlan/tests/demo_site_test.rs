//! Loads the bundled demo site and drives it through the gateway core

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use otlan::bacnet::{BacnetService, DeviceInstance, StandardSchema, WriteDirective};
use otlan::sim::{ProjectLoader, SimulatedNetwork};

fn demo_site() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demo/site")
}

fn device(value: u32) -> DeviceInstance {
    DeviceInstance::new(value).unwrap()
}

async fn service() -> BacnetService {
    let project = ProjectLoader::load(demo_site()).await.unwrap();
    let network = SimulatedNetwork::from_project(&project).unwrap();
    BacnetService::new(Arc::new(network), Arc::new(StandardSchema::new()))
}

#[tokio::test]
async fn test_demo_site_loads() {
    let project = assert_ok!(ProjectLoader::load(demo_site()).await);
    assert_eq!(project.id(), "demo-site");
    assert_eq!(project.devices.len(), 3);
    assert!(project.get_device(300001).is_some());
}

#[tokio::test]
async fn test_demo_site_reads() {
    let service = service().await;

    let value = service.read_property(device(201201), "analog-value,11", "present-value").await.unwrap();
    assert_eq!(value, json!(55.0));

    let units = service.read_property(device(300001), "analog-input,1", "units").await.unwrap();
    assert_eq!(units, json!(48));
}

#[tokio::test]
async fn test_demo_site_points_without_segmentation() {
    let service = service().await;

    // VAV-2 cannot return its object list in one piece
    let points = service.discover_points(device(201202)).await.unwrap();
    let names: Vec<&str> = points.iter().map(|point| point.name.as_str()).collect();
    assert_eq!(names, ["VAV-2", "ZN-T", "ZN-SP", "AIRFLOW", "OCC-MODE"]);
}

#[tokio::test]
async fn test_demo_site_command_fan() {
    let service = service().await;

    let stop = WriteDirective::new(device(201201), "binary-output,1", "present-value", json!("inactive"), Some(8)).unwrap();
    service.write_property(&stop).await.unwrap();
    let value = service.read_property(device(201201), "binary-output,1", "present-value").await.unwrap();
    assert_eq!(value, json!(0));

    let bad = WriteDirective::new(device(201201), "binary-output,1", "present-value", json!("half"), Some(8)).unwrap();
    assert_err!(service.write_property(&bad).await);
}
