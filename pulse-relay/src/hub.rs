//! The broadcast set.
//!
//! One task owns every open connection's outbound sender and handles
//! commands strictly one at a time, so fan-outs never interleave and the set
//! needs no lock.

use anyhow::{anyhow, Result};
use axum::extract::ws::Utf8Bytes;
use log::{debug, trace};
use pulse_common::{PulseEvent, WireMessage};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::{mpsc, oneshot},
    time,
};

const TIMEOUT: Duration = Duration::from_secs(3);

pub type ConnectionId = u64;

enum Command {
    Join {
        id: ConnectionId,
        tx: mpsc::UnboundedSender<Utf8Bytes>,
    },
    Leave {
        id: ConnectionId,
    },
    Publish(PulseEvent),
    Count(oneshot::Sender<usize>),
}

#[derive(Clone)]
pub struct Hub {
    tx: mpsc::UnboundedSender<Command>,
    next_id: Arc<AtomicU64>,
}

/// Membership in the broadcast set; leaves the set when dropped.
pub struct Member {
    pub id: ConnectionId,
    /// Encoded frames to write to this connection.
    pub rx: mpsc::UnboundedReceiver<Utf8Bytes>,
    hub_tx: mpsc::UnboundedSender<Command>,
}

impl Drop for Member {
    fn drop(&mut self) {
        let _ = self.hub_tx.send(Command::Leave { id: self.id });
    }
}

impl Hub {
    /// Starts the hub task on the current runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx));
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn join(&self) -> Result<Member> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.send(Command::Join { id, tx })?;
        Ok(Member {
            id,
            rx,
            hub_tx: self.tx.clone(),
        })
    }

    /// Queues `event` for delivery to every member, the sender included.
    pub fn publish(&self, event: PulseEvent) -> Result<()> {
        self.send(Command::Publish(event))
    }

    pub async fn connection_count(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Count(tx))?;
        Ok(time::timeout(TIMEOUT, rx).await??)
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.tx
            .send(cmd)
            .map_err(|_| anyhow!("relay hub has stopped"))
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut members: HashMap<ConnectionId, mpsc::UnboundedSender<Utf8Bytes>> = HashMap::new();
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Join { id, tx } => {
                members.insert(id, tx);
                debug!("connection {id} joined, {} open", members.len());
            }
            Command::Leave { id } => {
                if members.remove(&id).is_some() {
                    debug!("connection {id} left, {} open", members.len());
                }
            }
            Command::Publish(event) => {
                let frame = Utf8Bytes::from(WireMessage::Pulse(event).encode());
                let mut delivered = 0;
                for (id, tx) in &members {
                    if tx.send(frame.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        debug!("skipping closed connection {id}");
                    }
                }
                trace!("pulse fanned out to {delivered}/{} connections", members.len());
            }
            Command::Count(reply) => {
                let _ = reply.send(members.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(color: &str) -> PulseEvent {
        PulseEvent {
            x_norm: 0.5,
            y_norm: 0.5,
            color: color.into(),
        }
    }

    async fn next(member: &mut Member) -> String {
        time::timeout(TIMEOUT, member.rx.recv())
            .await
            .expect("timed out")
            .expect("hub closed")
            .as_str()
            .to_owned()
    }

    #[tokio::test]
    async fn test_fanout_includes_sender() {
        let hub = Hub::spawn();
        let mut a = hub.join().unwrap();
        let mut b = hub.join().unwrap();
        let mut c = hub.join().unwrap();

        hub.publish(event("#ff0000")).unwrap();
        let expected = r##"{"type":"pulse","xNorm":0.5,"yNorm":0.5,"color":"#ff0000"}"##;
        assert_eq!(next(&mut a).await, expected);
        assert_eq!(next(&mut b).await, expected);
        assert_eq!(next(&mut c).await, expected);
    }

    #[tokio::test]
    async fn test_dead_peer_skipped() {
        let hub = Hub::spawn();
        let mut a = hub.join().unwrap();
        let mut dead = hub.join().unwrap();
        let mut b = hub.join().unwrap();

        // Still listed in the set, but its transport is gone.
        dead.rx.close();
        hub.publish(event("#00ff00")).unwrap();
        hub.publish(event("#0000ff")).unwrap();

        assert!(next(&mut a).await.contains("#00ff00"));
        assert!(next(&mut a).await.contains("#0000ff"));
        assert!(next(&mut b).await.contains("#00ff00"));
        assert!(next(&mut b).await.contains("#0000ff"));
        assert_eq!(hub.connection_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_drop_leaves() {
        let hub = Hub::spawn();
        let a = hub.join().unwrap();
        let b = hub.join().unwrap();
        assert_eq!(hub.connection_count().await.unwrap(), 2);
        drop(a);
        assert_eq!(hub.connection_count().await.unwrap(), 1);
        drop(b);
        assert_eq!(hub.connection_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let hub = Hub::spawn();
        let mut a = hub.join().unwrap();
        for i in 0..20 {
            hub.publish(event(&format!("#0000{i:02x}"))).unwrap();
        }
        for i in 0..20 {
            assert!(next(&mut a).await.contains(&format!("#0000{i:02x}")));
        }
    }
}
