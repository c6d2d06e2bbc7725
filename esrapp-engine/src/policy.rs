//! Traffic-steering policy documents.
//!
//! Models the O-RAN traffic-steering preference (TSP) policy the controller
//! issues to drain a cell: a slice/QoS scope plus a per-cell preference
//! list. Serialization matches the policy store's JSON field naming.

use esrapp_common::{Plmn, NCI_LENGTH};
use serde::{Deserialize, Serialize};

/// Policy type under which all steering policies are filed.
pub const POLICY_TYPE_ID: &str = "ORAN_TrafficSteeringPreference_2.0.0";

/// Steering preference for the cells in a resource entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Preference {
    /// New traffic must not be steered to these cells
    Forbid,
    /// Steer traffic away from these cells when possible
    Avoid,
    /// Steer traffic to these cells when possible
    Prefer,
    /// Traffic must be steered to these cells
    Shall,
}

/// PLMN identifier as serialized in policy documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlmnId {
    /// Mobile Country Code
    pub mcc: String,
    /// Mobile Network Code
    pub mnc: String,
}

impl From<&Plmn> for PlmnId {
    fn from(plmn: &Plmn) -> Self {
        Self {
            mcc: plmn.mcc.clone(),
            mnc: plmn.mnc.clone(),
        }
    }
}

/// Slice identity scoping a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceId {
    /// Slice/Service Type
    pub sst: u8,
    /// Slice Differentiator
    pub sd: String,
    /// Owning PLMN
    pub plmn_id: PlmnId,
}

/// QoS identity scoping a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QosId {
    /// 5G QoS Identifier
    #[serde(rename = "5qI")]
    pub five_qi: u8,
}

/// Scope section of a TSP policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Slice the policy applies to
    pub slice_id: SliceId,
    /// QoS class the policy applies to
    pub qos_id: QosId,
}

/// Cell identity inside a resource entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TspCellId {
    /// Owning PLMN
    pub plmn_id: PlmnId,
    /// NR cell identity
    pub c_id: CId,
}

/// NCI wrapper matching the document's nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CId {
    /// 36-bit NR Cell Identity
    #[serde(rename = "ncI")]
    pub nci: u64,
}

/// One preference entry over a list of cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TspResource {
    /// Cells the preference applies to
    pub cell_id_list: Vec<TspCellId>,
    /// Steering preference
    pub preference: Preference,
}

/// A complete traffic-steering preference policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TspPolicy {
    /// Slice/QoS scope
    pub scope: Scope,
    /// Preference entries
    pub tsp_resources: Vec<TspResource>,
}

impl TspPolicy {
    /// Builds a single-cell FORBID policy: new traffic for the given slice
    /// and QoS class is steered away from the cell with this NCI.
    pub fn forbid(nci: u64, plmn: &Plmn, sst: u8, sd: &str, five_qi: u8) -> Self {
        let plmn_id = PlmnId::from(plmn);
        Self {
            scope: Scope {
                slice_id: SliceId {
                    sst,
                    sd: sd.to_string(),
                    plmn_id: plmn_id.clone(),
                },
                qos_id: QosId { five_qi },
            },
            tsp_resources: vec![TspResource {
                cell_id_list: vec![TspCellId {
                    plmn_id,
                    c_id: CId { nci },
                }],
                preference: Preference::Forbid,
            }],
        }
    }
}

/// Computes the 36-bit NR Cell Identity from the gNB identity and a
/// cell-local identifier.
pub fn compute_nci(gnb_id: u64, gnb_id_length: u8, cell_local_id: u32) -> u64 {
    (gnb_id << (NCI_LENGTH - gnb_id_length)) | u64::from(cell_local_id)
}
