use std::collections::BTreeMap;

use andromeda_std::{
    amp::{AMPCtx, AMPMsg, AMPPkt, AckResponse},
    common::DenomTrace,
    finance::splitter::{self, split_amount},
    os::{adodb, kernel, ModuleInstantiateMsg, IBC_VERSION, TRANSFER_PORT},
};
use cosmwasm_std::{coin, from_json, to_json_binary, Addr, Binary, Coin};
use log::debug;
use sha2::{Digest, Sha256};

use super::contracts::{
    AdodbState, Contract, ContractKind, KernelState, Packet, PacketData, SplitterState,
    TransferCoin,
};
use crate::{address::derived_address, chains::ChainDefinition, client::ClientError};

/// One end of an open channel as stored by the chain it lives on
#[derive(Debug, Clone)]
pub struct ChannelState {
    pub port_id: String,
    pub connection_id: String,
    pub counterparty_chain: String,
    pub counterparty_port: String,
    pub counterparty_channel: String,
    pub version: String,
}

fn execution_err(err: impl ToString) -> ClientError {
    ClientError::execution(err.to_string())
}

fn query_err(err: impl ToString) -> ClientError {
    ClientError::query(err.to_string())
}

/// The full state of a simulated chain, cloned before each transaction so a failure can be
/// rolled back
#[derive(Debug, Clone)]
pub struct ChainState {
    pub definition: &'static ChainDefinition,
    pub height: u64,
    codes: Vec<ContractKind>,
    contracts: BTreeMap<Addr, Contract>,
    contract_seq: u64,
    balances: BTreeMap<Addr, BTreeMap<String, u128>>,
    pub channels: BTreeMap<String, ChannelState>,
    pub next_channel: u64,
    pub next_connection: u64,
    next_sequence: u64,
    denom_traces: BTreeMap<String, DenomTrace>,
    pub uploads: usize,
    pub instantiations: usize,
}

impl ChainState {
    pub fn new(definition: &'static ChainDefinition) -> Self {
        ChainState {
            definition,
            height: 1,
            codes: vec![],
            contracts: BTreeMap::new(),
            contract_seq: 0,
            balances: BTreeMap::new(),
            channels: BTreeMap::new(),
            next_channel: 0,
            next_connection: 0,
            next_sequence: 1,
            denom_traces: BTreeMap::new(),
            uploads: 0,
            instantiations: 0,
        }
    }

    pub fn chain_id(&self) -> &str {
        self.definition.chain_id
    }

    /// Commits a block and returns a hash for the transaction included in it
    pub fn commit(&mut self) -> String {
        self.height += 1;
        let hash = Sha256::digest(format!("{}/{}", self.chain_id(), self.height).as_bytes());
        hex::encode_upper(hash)
    }

    pub fn balance(&self, addr: &Addr, denom: &str) -> u128 {
        self.balances
            .get(addr)
            .and_then(|b| b.get(denom))
            .copied()
            .unwrap_or_default()
    }

    pub fn mint(&mut self, addr: &Addr, denom: &str, amount: u128) {
        *self
            .balances
            .entry(addr.clone())
            .or_default()
            .entry(denom.to_string())
            .or_default() += amount;
    }

    fn burn(&mut self, addr: &Addr, denom: &str, amount: u128) -> Result<(), ClientError> {
        let available = self.balance(addr, denom);
        if available < amount {
            return Err(ClientError::execution(format!(
                "insufficient funds: {available}{denom} is smaller than {amount}{denom}"
            )));
        }
        if let Some(balance) = self.balances.get_mut(addr).and_then(|b| b.get_mut(denom)) {
            *balance -= amount;
        }
        Ok(())
    }

    pub fn transfer(&mut self, from: &Addr, to: &Addr, funds: &[Coin]) -> Result<(), ClientError> {
        for fund in funds {
            self.burn(from, &fund.denom, fund.amount.u128())?;
            self.mint(to, &fund.denom, fund.amount.u128());
        }
        Ok(())
    }

    fn escrow_address(channel: &str) -> Addr {
        Addr::unchecked(format!("escrow/{channel}"))
    }

    pub fn is_contract(&self, addr: &Addr) -> bool {
        self.contracts.contains_key(addr)
    }

    pub fn is_kernel(&self, addr: &Addr) -> bool {
        matches!(self.contracts.get(addr), Some(Contract::Kernel(_)))
    }

    pub fn upload(&mut self, wasm: &[u8]) -> u64 {
        self.codes.push(ContractKind::from_wasm(wasm));
        self.uploads += 1;
        self.codes.len() as u64
    }

    fn kernel(&self, addr: &Addr) -> Result<&KernelState, ClientError> {
        match self.contracts.get(addr) {
            Some(Contract::Kernel(state)) => Ok(state),
            _ => Err(ClientError::execution(format!("{addr} is not a kernel"))),
        }
    }

    fn kernel_mut(&mut self, addr: &Addr) -> Result<&mut KernelState, ClientError> {
        match self.contracts.get_mut(addr) {
            Some(Contract::Kernel(state)) => Ok(state),
            _ => Err(ClientError::execution(format!("{addr} is not a kernel"))),
        }
    }

    pub fn instantiate(
        &mut self,
        sender: &Addr,
        code_id: u64,
        msg: &Binary,
    ) -> Result<Addr, ClientError> {
        let kind = code_id
            .checked_sub(1)
            .and_then(|idx| self.codes.get(idx as usize))
            .copied()
            .ok_or_else(|| ClientError::not_found(format!("code id {code_id}: not found")))?;

        let contract = match kind {
            ContractKind::Kernel => {
                let msg: kernel::InstantiateMsg = from_json(msg).map_err(execution_err)?;
                Contract::Kernel(KernelState {
                    owner: msg.owner.map(Addr::unchecked).unwrap_or_else(|| sender.clone()),
                    chain_name: msg.chain_name,
                    key_addresses: BTreeMap::new(),
                    channels: BTreeMap::new(),
                    recoveries: BTreeMap::new(),
                })
            }
            ContractKind::Adodb | ContractKind::Vfs | ContractKind::Economics => {
                let msg: ModuleInstantiateMsg = from_json(msg).map_err(execution_err)?;
                let kernel_address = Addr::unchecked(msg.kernel_address);
                self.kernel(&kernel_address)?;
                if kind == ContractKind::Adodb {
                    Contract::Adodb(AdodbState::default())
                } else {
                    Contract::Module { kind }
                }
            }
            ContractKind::Splitter => {
                let msg: splitter::InstantiateMsg = from_json(msg).map_err(execution_err)?;
                let kernel_address = Addr::unchecked(msg.kernel_address);
                self.kernel(&kernel_address)?;
                SplitterState::validate(&msg.recipients)?;
                Contract::Splitter(SplitterState {
                    kernel_address,
                    recipients: msg.recipients,
                })
            }
            ContractKind::Inert => Contract::Inert,
        };

        self.contract_seq += 1;
        let seed = format!("{}/contract/{}", self.chain_id(), self.contract_seq);
        let address = derived_address(self.definition.prefix, &seed)
            .map_err(|err| ClientError::execution(err.to_string()))?;
        self.contracts.insert(address.clone(), contract);
        self.instantiations += 1;
        Ok(address)
    }

    /// Executes `msg` on `contract`, moving `funds` from `sender` first.
    ///
    /// `ctx` carries the AMP context when the call was routed by a kernel.
    pub fn execute(
        &mut self,
        outbox: &mut Vec<Packet>,
        sender: &Addr,
        contract: &Addr,
        msg: &Binary,
        funds: &[Coin],
        ctx: Option<AMPCtx>,
    ) -> Result<(), ClientError> {
        self.transfer(sender, contract, funds)?;
        let state = self
            .contracts
            .get(contract)
            .cloned()
            .ok_or_else(|| ClientError::not_found(format!("contract {contract}: not found")))?;

        match state {
            Contract::Kernel(_) => {
                let msg: kernel::ExecuteMsg = from_json(msg).map_err(execution_err)?;
                self.execute_kernel(outbox, sender, contract, msg)
            }
            Contract::Adodb(_) => {
                let adodb::ExecuteMsg::Publish {
                    code_id,
                    ado_type,
                    version,
                    ..
                } = from_json(msg).map_err(execution_err)?;
                if code_id == 0 || code_id as usize > self.codes.len() {
                    return Err(ClientError::execution(format!("Invalid code id {code_id}")));
                }
                if let Some(Contract::Adodb(db)) = self.contracts.get_mut(contract) {
                    db.code_ids.insert(ado_type.clone(), code_id);
                    db.ado_types.insert(code_id, ado_type.clone());
                    db.versions.insert(ado_type, version);
                }
                Ok(())
            }
            Contract::Splitter(splitter) => {
                let splitter::ExecuteMsg::Send {} = from_json(msg).map_err(execution_err)?;
                let ctx = ctx.unwrap_or_else(|| AMPCtx::new(sender.as_str(), sender.as_str(), 0));
                self.execute_splitter(outbox, contract, splitter, funds, ctx)
            }
            Contract::Module { kind } => Err(ClientError::execution(format!(
                "{kind:?} does not accept messages in this network"
            ))),
            Contract::Inert => Err(ClientError::execution("Unknown contract")),
        }
    }

    fn execute_kernel(
        &mut self,
        outbox: &mut Vec<Packet>,
        sender: &Addr,
        kernel_addr: &Addr,
        msg: kernel::ExecuteMsg,
    ) -> Result<(), ClientError> {
        match msg {
            kernel::ExecuteMsg::UpsertKeyAddress { key, value } => {
                let kernel = self.kernel_mut(kernel_addr)?;
                kernel.ensure_owner(sender)?;
                kernel.key_addresses.insert(key, Addr::unchecked(value));
                Ok(())
            }
            kernel::ExecuteMsg::AssignChannels {
                ics20_channel_id,
                direct_channel_id,
                chain,
                kernel_address,
            } => {
                let kernel = self.kernel_mut(kernel_addr)?;
                kernel.ensure_owner(sender)?;
                let supported_modules = kernel
                    .channels
                    .get(&chain)
                    .map(|info| info.supported_modules.clone())
                    .unwrap_or_default();
                kernel.channels.insert(
                    chain,
                    kernel::ChannelInfoResponse {
                        ics20: ics20_channel_id,
                        direct: direct_channel_id,
                        kernel_address,
                        supported_modules,
                    },
                );
                Ok(())
            }
            kernel::ExecuteMsg::Send { message } => {
                let ctx = AMPCtx::new(sender.as_str(), sender.as_str(), 0);
                self.route(outbox, kernel_addr, &message, &ctx)
            }
            kernel::ExecuteMsg::AMPReceive(packet) => {
                let ctx = AMPCtx::new(packet.ctx.get_origin(), sender.as_str(), packet.ctx.id);
                for message in &packet.messages {
                    self.route(outbox, kernel_addr, message, &ctx)?;
                }
                Ok(())
            }
            kernel::ExecuteMsg::Recover {} => {
                let recoveries = self
                    .kernel_mut(kernel_addr)?
                    .recoveries
                    .remove(sender)
                    .unwrap_or_default();
                if recoveries.is_empty() {
                    return Err(ClientError::execution("No recoveries found"));
                }
                self.transfer(kernel_addr, sender, &recoveries)
            }
        }
    }

    fn execute_splitter(
        &mut self,
        outbox: &mut Vec<Packet>,
        splitter_addr: &Addr,
        splitter: SplitterState,
        funds: &[Coin],
        ctx: AMPCtx,
    ) -> Result<(), ClientError> {
        if funds.is_empty() {
            return Err(ClientError::execution("No funds sent"));
        }
        let mut messages = vec![];
        for fund in funds {
            for (recipient, share) in split_amount(&splitter.recipients, fund.amount.u128()) {
                let msg = AMPMsg::new(
                    recipient.address.as_str(),
                    recipient.msg.clone().unwrap_or_default(),
                    Some(vec![coin(share, &fund.denom)]),
                )
                .with_config(andromeda_std::amp::AMPMsgConfig::direct(None))
                .with_ibc_recovery(recipient.ibc_recovery_address.clone());
                messages.push(msg);
            }
        }
        let packet = AMPPkt::new(ctx.get_origin(), splitter_addr.as_str(), messages);
        let total = packet.total_funds();
        let receive = to_json_binary(&packet.into_kernel_receive()).map_err(execution_err)?;
        self.execute(
            outbox,
            splitter_addr,
            &splitter.kernel_address,
            &receive,
            &total,
            None,
        )
    }

    /// Delivers a single AMP message held by the kernel
    fn route(
        &mut self,
        outbox: &mut Vec<Packet>,
        kernel_addr: &Addr,
        msg: &AMPMsg,
        ctx: &AMPCtx,
    ) -> Result<(), ClientError> {
        let chain_name = self.kernel(kernel_addr)?.chain_name.clone();
        if let Some(chain) = msg.recipient.get_chain() {
            if msg.recipient.is_cross_chain() && chain != chain_name {
                return self.send_remote(outbox, kernel_addr, chain, msg, ctx);
            }
        }

        let target = Addr::unchecked(msg.recipient.get_raw_address());
        if target.as_str().is_empty() {
            return Err(ClientError::execution(format!(
                "Invalid recipient {}",
                msg.recipient
            )));
        }
        debug!("Routing message to {target} on {}", self.chain_id());
        if msg.has_message() {
            if !self.is_contract(&target) {
                return Err(ClientError::execution(format!(
                    "{target} is not a contract, cannot execute message"
                )));
            }
            let forwarded = AMPCtx::new(ctx.get_origin(), kernel_addr.as_str(), ctx.id);
            self.execute(
                outbox,
                kernel_addr,
                &target,
                &msg.message,
                &msg.funds,
                Some(forwarded),
            )
        } else {
            self.transfer(kernel_addr, &target, &msg.funds)
        }
    }

    fn send_remote(
        &mut self,
        outbox: &mut Vec<Packet>,
        kernel_addr: &Addr,
        chain: &str,
        msg: &AMPMsg,
        ctx: &AMPCtx,
    ) -> Result<(), ClientError> {
        let info = self
            .kernel(kernel_addr)?
            .channels
            .get(chain)
            .cloned()
            .ok_or_else(|| ClientError::execution(format!("Channel not found for chain {chain}")))?;

        let channel_id = match msg.funds.is_empty() {
            true => info.direct.clone(),
            false => info.ics20.clone(),
        };
        let channel_id = channel_id
            .ok_or_else(|| ClientError::execution(format!("Channel not found for chain {chain}")))?;
        let channel = self
            .channels
            .get(&channel_id)
            .cloned()
            .ok_or_else(|| ClientError::execution(format!("Unknown channel {channel_id}")))?;

        let mut transfers = vec![];
        for fund in &msg.funds {
            let trace = self
                .denom_traces
                .get(&fund.denom)
                .cloned()
                .unwrap_or_else(|| DenomTrace::native(fund.denom.clone()));
            let amount = fund.amount.u128();
            let burned = trace
                .without_hop(&channel.port_id, &channel_id)
                .map_err(execution_err)?
                .is_some();
            if burned {
                self.burn(kernel_addr, &fund.denom, amount)?;
            } else {
                self.transfer(
                    kernel_addr,
                    &Self::escrow_address(&channel_id),
                    std::slice::from_ref(fund),
                )?;
            }
            transfers.push(TransferCoin {
                trace,
                local_denom: fund.denom.clone(),
                amount,
                burned,
            });
        }

        let recovery_addr = msg
            .recovery_addr()
            .map(|addr| Addr::unchecked(addr.get_raw_address()))
            .unwrap_or_else(|| Addr::unchecked(ctx.get_origin()));
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        debug!(
            "Sending packet {sequence} from {} over {channel_id} to {chain}",
            self.chain_id()
        );
        outbox.push(Packet {
            sequence,
            src_chain: self.chain_id().to_string(),
            src_port: channel.port_id.clone(),
            src_channel: channel_id,
            dest_chain: channel.counterparty_chain.clone(),
            dest_port: channel.counterparty_port.clone(),
            dest_channel: channel.counterparty_channel.clone(),
            data: PacketData {
                source_kernel: kernel_addr.clone(),
                kernel: Addr::unchecked(info.kernel_address),
                recipient: msg.recipient.clone(),
                message: msg.message.clone(),
                funds: transfers,
                ctx: ctx.clone(),
                recovery_addr,
            },
        });
        Ok(())
    }

    /// Handles a packet arriving on this chain and returns the acknowledgement to write.
    /// A failed delivery leaves no trace beyond the error acknowledgement.
    pub fn receive(&mut self, outbox: &mut Vec<Packet>, packet: &Packet) -> AckResponse {
        let snapshot = self.clone();
        let outbox_len = outbox.len();
        match self.try_receive(outbox, packet) {
            Ok(()) => AckResponse::Result(Binary::from(vec![1u8])),
            Err(err) => {
                debug!(
                    "Packet {} failed on {}: {}",
                    packet.sequence,
                    self.chain_id(),
                    err.message()
                );
                *self = snapshot;
                outbox.truncate(outbox_len);
                AckResponse::error(err.message())
            }
        }
    }

    fn try_receive(&mut self, outbox: &mut Vec<Packet>, packet: &Packet) -> Result<(), ClientError> {
        let data = &packet.data;
        let channel = self
            .channels
            .get(&packet.dest_channel)
            .ok_or_else(|| ClientError::execution(format!("Unknown channel {}", packet.dest_channel)))?;
        if channel.port_id != packet.dest_port
            || (channel.port_id != TRANSFER_PORT && channel.version != IBC_VERSION)
        {
            return Err(ClientError::execution(format!(
                "Packet does not match channel {}",
                packet.dest_channel
            )));
        }
        let kernel_addr = if packet.dest_port == TRANSFER_PORT {
            data.kernel.clone()
        } else {
            Addr::unchecked(packet.dest_port.trim_start_matches("wasm."))
        };
        self.kernel(&kernel_addr)?;

        let mut funds = vec![];
        for transfer in &data.funds {
            let unwound = transfer
                .trace
                .without_hop(&packet.src_port, &packet.src_channel)
                .map_err(execution_err)?;
            let denom = match unwound {
                Some(trace) => {
                    let denom = trace.get_ibc_denom();
                    self.transfer(
                        &Self::escrow_address(&packet.dest_channel),
                        &kernel_addr,
                        &[coin(transfer.amount, &denom)],
                    )?;
                    denom
                }
                None => {
                    let trace = transfer.trace.with_hop(&packet.dest_port, &packet.dest_channel);
                    let denom = trace.get_ibc_denom();
                    self.denom_traces.insert(denom.clone(), trace);
                    self.mint(&kernel_addr, &denom, transfer.amount);
                    denom
                }
            };
            funds.push(coin(transfer.amount, denom));
        }

        let message = AMPMsg::new(
            data.recipient.get_raw_path(),
            data.message.clone(),
            Some(funds),
        );
        self.route(outbox, &kernel_addr, &message, &data.ctx)
    }

    /// Processes an error acknowledgement for a packet this chain sent
    pub fn refund(&mut self, packet: &Packet) -> Result<(), ClientError> {
        let kernel_addr = &packet.data.source_kernel;
        for transfer in &packet.data.funds {
            if transfer.burned {
                self.mint(kernel_addr, &transfer.local_denom, transfer.amount);
            } else {
                self.transfer(
                    &Self::escrow_address(&packet.src_channel),
                    kernel_addr,
                    &[coin(transfer.amount, &transfer.local_denom)],
                )?;
            }
            self.kernel_mut(kernel_addr)?.add_recovery(
                packet.data.recovery_addr.clone(),
                coin(transfer.amount, &transfer.local_denom),
            );
        }
        Ok(())
    }

    /// Validates that `port` can hold a channel with the given version
    pub fn validate_port(&self, port: &str, version: &str) -> Result<(), ClientError> {
        if port == TRANSFER_PORT {
            return Ok(());
        }
        let addr = port
            .strip_prefix("wasm.")
            .ok_or_else(|| ClientError::execution(format!("Unknown port {port}")))?;
        if !self.is_kernel(&Addr::unchecked(addr)) {
            return Err(ClientError::execution(format!(
                "Port {port} is not bound on {}",
                self.chain_id()
            )));
        }
        if version != IBC_VERSION {
            return Err(ClientError::execution(format!(
                "Invalid IBC version {version}, expected {IBC_VERSION}"
            )));
        }
        Ok(())
    }

    pub fn query(&self, contract: &Addr, msg: &Binary) -> Result<Binary, ClientError> {
        match self.contracts.get(contract) {
            Some(Contract::Kernel(state)) => {
                let msg: kernel::QueryMsg = from_json(msg).map_err(query_err)?;
                match msg {
                    kernel::QueryMsg::KeyAddress { key } => {
                        let addr = state
                            .key_addresses
                            .get(&key)
                            .ok_or_else(|| ClientError::not_found(format!("key {key}: not found")))?;
                        to_json_binary(addr)
                    }
                    kernel::QueryMsg::ChannelInfo { chain } => {
                        to_json_binary(&state.channels.get(&chain))
                    }
                    kernel::QueryMsg::Recoveries { addr } => {
                        to_json_binary(&state.recoveries.get(&addr).cloned().unwrap_or_default())
                    }
                    kernel::QueryMsg::ChainName {} => to_json_binary(&kernel::ChainNameResponse {
                        chain_name: state.chain_name.clone(),
                    }),
                }
                .map_err(query_err)
            }
            Some(Contract::Adodb(state)) => {
                let msg: adodb::QueryMsg = from_json(msg).map_err(query_err)?;
                match msg {
                    adodb::QueryMsg::CodeId { key } => {
                        let code_id = state
                            .code_ids
                            .get(&key)
                            .ok_or_else(|| ClientError::not_found(format!("ado type {key}: not found")))?;
                        to_json_binary(code_id)
                    }
                    adodb::QueryMsg::ADOType { code_id } => {
                        to_json_binary(&state.ado_types.get(&code_id))
                    }
                }
                .map_err(query_err)
            }
            Some(Contract::Splitter(state)) => {
                let splitter::QueryMsg::GetSplitterConfig {} = from_json(msg).map_err(query_err)?;
                to_json_binary(&state.recipients).map_err(query_err)
            }
            Some(_) => Err(ClientError::query("Unsupported query")),
            None => Err(ClientError::not_found(format!("contract {contract}: not found"))),
        }
    }
}
