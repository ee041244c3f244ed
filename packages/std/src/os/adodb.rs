use cosmwasm_schema::{cw_serde, QueryResponses};

pub use super::ModuleInstantiateMsg as InstantiateMsg;

#[cw_serde]
pub struct ActionFee {
    pub action: String,
    pub asset: String,
    pub amount: cosmwasm_std::Uint128,
    pub receiver: Option<String>,
}

#[cw_serde]
pub enum ExecuteMsg {
    Publish {
        code_id: u64,
        ado_type: String,
        action_fees: Option<Vec<ActionFee>>,
        version: String,
        publisher: Option<String>,
    },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    /// The latest code ID published for an ADO type
    #[returns(u64)]
    CodeId { key: String },
    #[returns(Option<String>)]
    #[serde(rename = "ado_type")]
    ADOType { code_id: u64 },
}
