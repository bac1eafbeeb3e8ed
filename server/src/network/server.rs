//! UDP game server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use log::{error, info, warn};
use tokio::net::UdpSocket;

use realm_shared::{ClientMessage, PlayerId, ServerMessage, PROTOCOL_VERSION};

use crate::entities::Character;
use crate::persistence::PersistenceHandle;
use crate::timestamp::Timestamp;
use crate::world::World;

/// Maximum packet size
const MAX_PACKET_SIZE: usize = 1200;

/// Connection timeout in seconds
const CONNECTION_TIMEOUT: f32 = 30.0;

/// An in-game client
#[derive(Debug)]
pub struct ClientConnection {
    pub player_id: PlayerId,
    pub name: String,
    pub last_seen: Instant,
    /// Outgoing message queue
    pub outgoing_queue: Vec<ServerMessage>,
}

impl ClientConnection {
    pub fn new(player_id: PlayerId, name: String) -> Self {
        Self {
            player_id,
            name,
            last_seen: Instant::now(),
            outgoing_queue: Vec::new(),
        }
    }

    pub fn is_timed_out(&self) -> bool {
        self.last_seen.elapsed().as_secs_f32() > CONNECTION_TIMEOUT
    }
}

/// Game server
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: HashMap<SocketAddr, ClientConnection>,
    addr_by_player: HashMap<PlayerId, SocketAddr>,
    next_player_id: PlayerId,
    /// Persistence handle (optional - server works without it)
    persistence: Option<PersistenceHandle>,
}

impl Server {
    /// Create a new server listening on the given port
    pub async fn new(port: u16, persistence: Option<PersistenceHandle>) -> Result<Self, std::io::Error> {
        let addr = format!("0.0.0.0:{}", port);
        let socket = UdpSocket::bind(&addr).await?;

        Ok(Self {
            socket: Arc::new(socket),
            clients: HashMap::new(),
            addr_by_player: HashMap::new(),
            next_player_id: 0,
            persistence,
        })
    }

    /// Process incoming network messages
    pub async fn process_incoming(&mut self, world: &mut World, now: Timestamp) {
        let mut buf = [0u8; MAX_PACKET_SIZE];

        // Non-blocking receive loop
        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((len, addr)) => {
                    self.handle_packet(&buf[..len], addr, world, now).await;
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    break;
                }
                Err(e) => {
                    error!("Error receiving packet: {}", e);
                    break;
                }
            }
        }

        self.check_timeouts(world);
    }

    async fn handle_packet(&mut self, data: &[u8], addr: SocketAddr, world: &mut World, now: Timestamp) {
        let message = match ClientMessage::deserialize(data) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Failed to deserialize packet from {}: {}", addr, e);
                return;
            }
        };

        let message = match message {
            ClientMessage::EnterGame { protocol_version, character_id, name } => {
                self.handle_enter_game(addr, protocol_version, character_id, name, world, now).await;
                return;
            }
            other => other,
        };

        let Some(client) = self.clients.get_mut(&addr) else {
            return;
        };
        client.last_seen = Instant::now();
        let id = client.player_id;

        if let Some(character) = world.get_character_mut(id) {
            character.timestamp = now;
        }

        match message {
            ClientMessage::EnterGame { .. } => {}
            ClientMessage::Disconnect => self.handle_disconnect(addr, world),
            ClientMessage::PartyRequest { target_id, kind } => {
                world.party_request(id, target_id, kind);
            }
            ClientMessage::PartyAccept { requester_id, kind } => {
                world.party_accept(id, requester_id, kind);
            }
            ClientMessage::PartyRemove { player_id } => {
                world.party_remove(id, player_id);
            }
            ClientMessage::PartyList => world.party_list(id),
            ClientMessage::PartyChat { message } => world.party_chat(id, &message),
            ClientMessage::TradeRequest { target_id } => {
                world.trade_request(id, target_id);
            }
            ClientMessage::TradeAccept { requester_id } => {
                world.trade_accept(id, requester_id);
            }
            ClientMessage::TradeAdd { item_id, amount } => {
                world.trade_add(id, item_id, amount);
            }
            ClientMessage::TradeRemove { item_id } => {
                world.trade_remove(id, item_id);
            }
            ClientMessage::TradeAgree { agree } => {
                world.trade_agree(id, agree);
            }
            ClientMessage::TradeClose => {
                world.cancel_trade(id);
            }
            ClientMessage::SpellRequest { spell_id, target, target_id } => {
                world.spell_request(id, spell_id, target, target_id, now);
            }
            ClientMessage::SpellAct => {
                world.spell_act(id);
            }
            ClientMessage::SpellCancel => {
                world.cancel_spell(id);
            }
            ClientMessage::Equip { item_id, subloc } => {
                world.equip(id, item_id, subloc);
            }
            ClientMessage::Unequip { item_id, subloc } => {
                world.unequip(id, item_id, subloc);
            }
        }
    }

    async fn handle_enter_game(
        &mut self,
        addr: SocketAddr,
        protocol_version: u32,
        character_id: i64,
        name: String,
        world: &mut World,
        now: Timestamp,
    ) {
        if self.clients.contains_key(&addr) {
            return;
        }

        if protocol_version != PROTOCOL_VERSION {
            let reason = format!(
                "Protocol version mismatch: client {}, server {}",
                protocol_version, PROTOCOL_VERSION
            );
            self.send_to(addr, &ServerMessage::EnterGameFailed { reason }).await;
            return;
        }

        let Some(player_id) = self.allocate_player_id(world) else {
            self.send_to(addr, &ServerMessage::EnterGameFailed { reason: "Server is full".into() }).await;
            return;
        };

        let character = match self.prepare_character(player_id, character_id, &name).await {
            Ok(character) => character,
            Err(reason) => {
                warn!("{} could not enter the world: {}", addr, reason);
                self.send_to(addr, &ServerMessage::EnterGameFailed { reason }).await;
                return;
            }
        };

        let name = character.name.clone();
        world.add_character(character, now);

        let Some(character) = world.get_character(player_id) else {
            return;
        };
        let mut connection = ClientConnection::new(player_id, name.clone());
        connection.outgoing_queue.push(ServerMessage::EnterGameSuccess {
            player_id,
            name: character.name.clone(),
            level: character.level,
            experience: character.exp,
            map_id: character.map,
            hp: character.hp,
            max_hp: character.max_hp,
            tp: character.tp,
            max_tp: character.max_tp,
            inventory: character.inventory.clone(),
            paperdoll: character.paperdoll,
            spells: character.spells.clone(),
        });

        self.clients.insert(addr, connection);
        self.addr_by_player.insert(player_id, addr);
        info!("{} ({}) connected from {}", name, player_id, addr);
    }

    /// Load a stored character or create a fresh one
    async fn prepare_character(&self, player_id: PlayerId, character_id: i64, name: &str) -> Result<Character, String> {
        if character_id > 0 {
            let persistence = self.persistence.as_ref().ok_or("Persistence unavailable")?;
            let record = persistence
                .load_character(character_id)
                .await
                .ok_or("Character not found")?;
            return Ok(Character::from_record(player_id, &record));
        }

        if !Character::valid_name(name) {
            return Err(format!("Invalid name: {}", name));
        }

        let mut character = Character::new(player_id, name.to_string());
        if let Some(persistence) = &self.persistence {
            character.db_id = persistence
                .create_character(name)
                .await
                .map_err(|e| e.to_string())?;
        }
        Ok(character)
    }

    fn allocate_player_id(&mut self, world: &World) -> Option<PlayerId> {
        for _ in 0..PlayerId::MAX {
            self.next_player_id = self.next_player_id.wrapping_add(1);
            let id = self.next_player_id;
            if id != 0 && !self.addr_by_player.contains_key(&id) && world.get_character(id).is_none() {
                return Some(id);
            }
        }
        None
    }

    /// Save and drop a client's character
    fn handle_disconnect(&mut self, addr: SocketAddr, world: &mut World) {
        let Some(connection) = self.clients.remove(&addr) else {
            return;
        };
        self.addr_by_player.remove(&connection.player_id);

        if let Some(character) = world.remove_character(connection.player_id) {
            self.save(&character);
        }
        info!("{} ({}) disconnected", connection.name, connection.player_id);
    }

    fn check_timeouts(&mut self, world: &mut World) {
        let timed_out: Vec<SocketAddr> = self
            .clients
            .iter()
            .filter(|(_, c)| c.is_timed_out())
            .map(|(addr, _)| *addr)
            .collect();

        for addr in timed_out {
            if let Some(client) = self.clients.get(&addr) {
                warn!("{} timed out", client.name);
            }
            self.handle_disconnect(addr, world);
        }
    }

    /// Route world messages to client queues and flush them
    pub async fn process_outgoing(&mut self, world: &mut World) {
        for (to, msg) in world.drain_outbox() {
            let client = self
                .addr_by_player
                .get(&to)
                .and_then(|addr| self.clients.get_mut(addr));
            if let Some(client) = client {
                client.outgoing_queue.push(msg);
            }
        }

        for (addr, client) in &mut self.clients {
            for msg in client.outgoing_queue.drain(..) {
                let data = msg.serialize();
                if let Err(e) = self.socket.send_to(&data, addr).await {
                    error!("Failed to send to {}: {}", addr, e);
                }
            }
        }
    }

    async fn send_to(&self, addr: SocketAddr, msg: &ServerMessage) {
        let data = msg.serialize();
        if let Err(e) = self.socket.send_to(&data, addr).await {
            error!("Failed to send to {}: {}", addr, e);
        }
    }

    fn save(&self, character: &Character) {
        if let Some(persistence) = &self.persistence {
            persistence.save_character(character.to_record());
        }
    }

    /// Save every connected character (called periodically and on shutdown)
    pub fn save_all(&self, world: &World) {
        for client in self.clients.values() {
            if let Some(character) = world.get_character(client.player_id) {
                self.save(character);
            }
        }
    }
}
