//! # gridsim-cli::drivers
//!
//! Demo application entities attached to the topology by `run`: a ping
//! driver that probes a far host after the routing tables settle, and
//! a quiet host that just terminates cleanly.

use gridsim_engine::{entity::Entity, event::Event, sim::Ctx};
use gridsim_types::{
    errors::SimError,
    packet::{Packet, PacketHeader, ProbePacket},
    payload::Payload,
    tags::Tag,
    time::SimTime,
};

/// Sends a probe to a named host once the advertisement period has
/// passed and reports the round trip through tracing.
pub struct PingDriver {
    target: String,
    probe_size: u64,
    send_at: SimTime,
    sent_at: SimTime,
}

impl PingDriver {
    pub fn new(target: String, probe_size: u64, send_at: SimTime) -> Self {
        Self {
            target,
            probe_size,
            send_at,
            sent_at: 0.0,
        }
    }
}

impl Entity for PingDriver {
    fn on_start(&mut self, ctx: &mut Ctx<'_>) -> Result<(), SimError> {
        ctx.pause(self.send_at)
    }

    fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
        match (ev.tag, ev.payload) {
            (Tag::Insignificant, _) => {
                let dst = ctx
                    .lookup(&self.target)
                    .ok_or_else(|| SimError::UnknownName(self.target.clone()))?;
                let probe = ProbePacket::new(PacketHeader {
                    id: ctx.next_packet_id(),
                    src: ctx.me(),
                    dst,
                    last_hop: ctx.me(),
                    size_bytes: self.probe_size,
                    class: 0,
                    tag: Tag::InfopktSubmit,
                });
                self.sent_at = ctx.now();
                tracing::info!(host = ctx.my_name(), target = %self.target, "probe sent");
                ctx.send_to_port(
                    "output",
                    0.0,
                    Tag::SendPacket,
                    Payload::Packet(Box::new(Packet::Probe(probe))),
                )?;
                Ok(())
            }
            (Tag::InfopktReturn, Payload::Packet(pkt)) => {
                if let Packet::Probe(probe) = *pkt {
                    tracing::info!(
                        host = ctx.my_name(),
                        rtt = ctx.now() - self.sent_at,
                        hops = probe.hops(),
                        bottleneck_bps = probe.bottleneck_bps,
                        "probe returned"
                    );
                }
                Ok(())
            }
            (Tag::EndOfSimulation, _) => {
                ctx.finish();
                Ok(())
            }
            (tag, _) => {
                tracing::debug!(host = ctx.my_name(), ?tag, "event ignored");
                Ok(())
            }
        }
    }
}

/// A host that accepts whatever arrives and finishes on shutdown.
pub struct QuietHost;

impl Entity for QuietHost {
    fn on_event(&mut self, ctx: &mut Ctx<'_>, ev: Event) -> Result<(), SimError> {
        match ev.tag {
            Tag::EndOfSimulation => ctx.finish(),
            _ => tracing::debug!(host = ctx.my_name(), tag = ?ev.tag, "delivery received"),
        }
        Ok(())
    }
}
