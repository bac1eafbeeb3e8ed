//! Spell casting: request arms a timer, the world tick makes it ready, the
//! caster then acts and the target is checked again before anything happens.

use log::debug;
use rand::Rng;
use realm_shared::{PlayerId, ServerMessage, SpellEffect, SpellTarget};

use crate::entities::PendingSpell;
use crate::network::Transport;
use crate::timestamp::Timestamp;

use super::World;

/// What a ready spell resolved against
enum Resolved {
    Characters(Vec<PlayerId>),
    Npc(u16),
}

impl World {
    /// Start casting. Any cast already in flight is replaced.
    pub fn spell_request(
        &mut self,
        caster: PlayerId,
        spell_id: i16,
        target: SpellTarget,
        target_id: u16,
        now: Timestamp,
    ) -> bool {
        let Some(def) = self.ctx.spell(spell_id) else {
            return false;
        };
        let Some(character) = self.characters.get(&caster) else {
            return false;
        };
        if !character.has_spell(spell_id) || !def.allows(target) || character.tp < def.tp_cost {
            debug!("{} cannot cast spell {} at {:?}", character.name, spell_id, target);
            return false;
        }
        let delay = def.cast_time;

        // attacking ends a trade
        if target == SpellTarget::Npc {
            self.cancel_trade(caster);
        }

        let Some(character) = self.characters.get_mut(&caster) else {
            return false;
        };
        character.timestamp = now;
        if let Some(previous) = character.spell.pending() {
            debug!("{} abandons spell {}", character.name, previous.spell_id);
        }
        let pending = PendingSpell { spell_id, target, target_id, armed_at: now, delay };
        debug!("{} casting spell {} (ready at {:?})", character.name, spell_id, pending.ready_at());
        character.spell.begin(pending);
        self.outbox.send(caster, ServerMessage::SpellRequest { caster_id: caster, spell_id });
        true
    }

    /// Abort the current cast
    pub fn cancel_spell(&mut self, caster: PlayerId) -> bool {
        let Some(spell) = self.characters.get_mut(&caster).and_then(|c| c.cancel_spell()) else {
            return false;
        };
        self.outbox.send(caster, ServerMessage::SpellCancel { caster_id: caster, spell_id: spell.spell_id });
        true
    }

    /// Resolve a ready spell against its stored target. Illegal targets and
    /// missing tp fizzle the spell.
    pub fn spell_act(&mut self, caster: PlayerId) -> bool {
        let Some(spell) = self.characters.get_mut(&caster).and_then(|c| c.spell.take_ready()) else {
            return false;
        };
        let Some(def) = self.ctx.spell(spell.spell_id).cloned() else {
            return false;
        };

        let resolved = match self.resolve_target(caster, &spell) {
            Some(resolved) => resolved,
            None => {
                debug!("Spell {} from {} lost its target", spell.spell_id, caster);
                self.outbox.send(caster, ServerMessage::SpellCancel { caster_id: caster, spell_id: spell.spell_id });
                return false;
            }
        };

        let Some(character) = self.characters.get_mut(&caster) else {
            return false;
        };
        if character.tp < def.tp_cost {
            self.outbox.send(caster, ServerMessage::SpellCancel { caster_id: caster, spell_id: spell.spell_id });
            return false;
        }
        character.tp -= def.tp_cost;

        match (def.effect, resolved) {
            (SpellEffect::Heal(amount), Resolved::Characters(targets)) => {
                for target in targets {
                    self.heal(caster, spell.spell_id, target, amount);
                }
            }
            (SpellEffect::Damage { min, max }, Resolved::Npc(index)) => {
                self.damage_npc(caster, spell.spell_id, index, min, max);
            }
            _ => debug!("Spell {} has no effect on its target kind", spell.spell_id),
        }

        if let Some(character) = self.characters.get(&caster) {
            self.outbox.send(caster, character.stats_update());
        }
        true
    }

    /// Who or what the stored target stands for right now, if it is still
    /// legal for the target kind
    fn resolve_target(&self, caster: PlayerId, spell: &PendingSpell) -> Option<Resolved> {
        let character = self.characters.get(&caster)?;

        match spell.target {
            SpellTarget::SelfOnly => Some(Resolved::Characters(vec![caster])),
            SpellTarget::Npc => {
                let npc = self.npcs.get(&spell.target_id)?;
                (npc.alive && npc.map == character.map).then_some(Resolved::Npc(npc.index))
            }
            SpellTarget::Player => {
                let target = self.characters.get(&spell.target_id)?;
                (target.map == character.map && !target.nowhere)
                    .then_some(Resolved::Characters(vec![target.player_id]))
            }
            SpellTarget::Group => {
                let party = self.parties.get(character.party?)?;
                let members = party
                    .members
                    .iter()
                    .copied()
                    .filter(|id| {
                        self.characters
                            .get(id)
                            .map(|c| c.map == character.map && !c.nowhere)
                            .unwrap_or(false)
                    })
                    .collect();
                Some(Resolved::Characters(members))
            }
            SpellTarget::Invalid => None,
        }
    }

    fn heal(&mut self, caster: PlayerId, spell_id: i16, target: PlayerId, amount: i16) {
        let Some(character) = self.characters.get(&target) else {
            return;
        };
        let hp = character.hp.saturating_add(amount);
        self.set_hp(target, hp);

        let Some(character) = self.characters.get(&target) else {
            return;
        };
        let msg = ServerMessage::SpellHeal {
            caster_id: caster,
            spell_id,
            target_id: target,
            amount,
            hp_percent: character.hp_percent(),
        };
        if target != caster {
            self.outbox.send(target, msg.clone());
        }
        self.outbox.send(caster, msg);
    }

    fn damage_npc(&mut self, caster: PlayerId, spell_id: i16, index: u16, min: i16, max: i16) {
        let Some(npc) = self.npcs.get_mut(&index) else {
            return;
        };
        let damage = rand::thread_rng().gen_range(min.min(max)..=max);
        let killed = npc.take_damage(damage);
        let reward = npc.experience_reward;

        self.outbox.send(
            caster,
            ServerMessage::SpellDamage {
                caster_id: caster,
                spell_id,
                npc_index: index,
                damage,
                hp_percent: npc.hp_percent(),
                killed,
            },
        );

        if killed {
            debug!("NPC {} killed by {}", index, caster);
            self.award_exp(caster, reward);
        }
    }
}
