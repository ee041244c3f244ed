use crate::amp::recipient::Recipient;
use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::Decimal;

#[cw_serde]
pub struct AddressPercent {
    pub recipient: Recipient,
    pub percent: Decimal,
}

impl AddressPercent {
    pub fn new(recipient: Recipient, percent: Decimal) -> Self {
        Self { recipient, percent }
    }
}

#[cw_serde]
pub struct InstantiateMsg {
    /// Anytime a `Send` execute message is sent the amount sent will be divided amongst these
    /// recipients depending on their assigned percentage.
    pub recipients: Vec<AddressPercent>,
    pub kernel_address: String,
    pub owner: Option<String>,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Divides any attached funds to the message amongst the recipients list.
    Send {},
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(Vec<AddressPercent>)]
    GetSplitterConfig {},
}

/// Splits `amount` by each recipient's percentage, rounding down. Any remainder stays with the
/// caller.
pub fn split_amount(recipients: &[AddressPercent], amount: u128) -> Vec<(Recipient, u128)> {
    recipients
        .iter()
        .map(|ap| {
            let share = cosmwasm_std::Uint128::new(amount).mul_floor(ap.percent);
            (ap.recipient.clone(), share.u128())
        })
        .filter(|(_, share)| *share > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_amount() {
        let recipients = vec![
            AddressPercent::new(Recipient::from_string("osmo1a"), Decimal::percent(50)),
            AddressPercent::new(Recipient::from_string("osmo1b"), Decimal::percent(25)),
        ];
        let shares = split_amount(&recipients, 101);
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].1, 50);
        assert_eq!(shares[1].1, 25);
    }

    #[test]
    fn test_split_amount_full() {
        let recipients = vec![AddressPercent::new(
            Recipient::from_string("ibc://osmo-a/osmo1a"),
            Decimal::one(),
        )];
        let shares = split_amount(&recipients, 100);
        assert_eq!(shares, vec![(Recipient::from_string("ibc://osmo-a/osmo1a"), 100)]);
    }
}
