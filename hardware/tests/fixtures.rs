// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! End-to-end topology assembly over recorded machine hierarchies.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};

use fabtopo_hardware::config::SourceConfig;
use fabtopo_hardware::file::FileSource;
use fabtopo_hardware::{
    Context, DeviceType, NumaNode, PciAddress, Provider, SourceError, Topology, TopologyError,
    TopologyProvider,
};
use tracing_test::traced_test;

fn testdata(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name)
}

async fn topology_of(fixture: &str) -> Topology {
    Provider::new(FileSource::new(testdata(fixture)))
        .topology(&Context::new())
        .await
        .expect("fixture topology")
}

/// Render a node as `(id, cores, [(address, [(name, type)])])` for compact comparison.
#[allow(clippy::type_complexity)]
fn summarize(node: &NumaNode) -> (u32, usize, Vec<(String, Vec<(String, DeviceType)>)>) {
    let devices = node
        .devices()
        .iter()
        .map(|(addr, devices)| {
            (
                addr.to_string(),
                devices
                    .iter()
                    .map(|d| (d.name().to_string(), d.device_type()))
                    .collect(),
            )
        })
        .collect();
    (node.id(), node.num_cores(), devices)
}

fn expect(
    entries: &[(&str, &[(&str, DeviceType)])],
) -> Vec<(String, Vec<(String, DeviceType)>)> {
    entries
        .iter()
        .map(|(addr, devices)| {
            (
                (*addr).to_string(),
                devices
                    .iter()
                    .map(|(name, t)| ((*name).to_string(), *t))
                    .collect(),
            )
        })
        .collect()
}

const NET: DeviceType = DeviceType::Network;
const OFI: DeviceType = DeviceType::OpenFabrics;

fn assert_ids_match_keys(topology: &Topology) {
    for (id, node) in topology.numa_nodes() {
        assert_eq!(*id, node.id());
    }
}

#[tokio::test]
#[traced_test]
async fn boro_84() {
    let topology = topology_of("boro-84.yaml").await;
    assert_ids_match_keys(&topology);
    assert_eq!(topology.len(), 2);
    assert_eq!(
        summarize(topology.numa_node(0).unwrap()),
        (
            0,
            24,
            expect(&[
                ("0000:18:00.0", &[("ib0", NET), ("hfi1_0", OFI)]),
                ("0000:3d:00.0", &[("eth0", NET), ("i40iw1", OFI)]),
                ("0000:3d:00.1", &[("eth1", NET), ("i40iw0", OFI)]),
            ])
        )
    );
    assert_eq!(summarize(topology.numa_node(1).unwrap()), (1, 24, vec![]));
    assert!(topology.numa_node(1).unwrap().devices().is_empty());
}

#[tokio::test]
#[traced_test]
async fn wolf_133() {
    let topology = topology_of("wolf-133.yaml").await;
    assert_ids_match_keys(&topology);
    assert_eq!(
        summarize(topology.numa_node(1).unwrap()),
        (
            1,
            24,
            expect(&[("0000:af:00.0", &[("ib1", NET), ("hfi1_1", OFI)])])
        )
    );
    let hfi: PciAddress = "0000:af:00.0".parse().unwrap();
    assert_eq!(topology.node_of(&hfi).unwrap().id(), 1);
    let (node, device) = topology.find_device("hfi1_0").unwrap();
    assert_eq!(node.id(), 0);
    assert!(device.device_type().is_open_fabrics());
}

#[tokio::test]
#[traced_test]
async fn gcp_without_devices() {
    let topology = topology_of("gcp.yaml").await;
    assert_ids_match_keys(&topology);
    assert_eq!(summarize(topology.numa_node(0).unwrap()), (0, 8, vec![]));
    assert_eq!(summarize(topology.numa_node(1).unwrap()), (1, 8, vec![]));
}

#[tokio::test]
#[traced_test]
async fn multiport_adapters_keep_discovery_order() {
    let topology = topology_of("multiport.yaml").await;
    assert_ids_match_keys(&topology);
    assert_eq!(
        summarize(topology.numa_node(0).unwrap()),
        (
            0,
            8,
            expect(&[
                (
                    "0000:02:00.0",
                    &[("ib0", NET), ("enp2s0", NET), ("mlx4_0", OFI)]
                ),
                ("0000:06:00.0", &[("enp6s0", NET)]),
            ])
        )
    );
    assert_eq!(
        summarize(topology.numa_node(1).unwrap()),
        (
            1,
            8,
            expect(&[(
                "0000:83:00.0",
                &[("ib1", NET), ("ib2", NET), ("mlx4_1", OFI)]
            )])
        )
    );
}

#[tokio::test]
#[traced_test]
async fn no_numa_nodes_collapse_to_node_zero() {
    let topology = topology_of("no-numa.yaml").await;
    assert_eq!(topology.len(), 1);
    assert_eq!(
        summarize(topology.numa_node(0).unwrap()),
        (
            0,
            4,
            expect(&[("0000:18:00.0", &[("ib0", NET), ("hfi1_0", OFI)])])
        )
    );
}

#[tokio::test]
#[traced_test]
async fn unreadable_override_fails_the_call() {
    let source = SourceConfig::File(testdata("missing.yaml"))
        .into_source()
        .unwrap();
    let err = Provider::new(source)
        .topology(&Context::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TopologyError::Source(SourceError::Read { .. })
    ));
}

#[tokio::test]
#[traced_test]
async fn malformed_hierarchy_fails_the_call() {
    let err = Provider::new(FileSource::new(testdata("malformed.yaml")))
        .topology(&Context::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TopologyError::Source(SourceError::Parse { .. })
    ));
}
