//! The Redis-backed work queue (§4.1/§6). Jobs are delivered at-least-once
//! through a Streams consumer group; a message that fails is either
//! rescheduled into a delay sorted set (exponential backoff, doubling,
//! capped at 60s) or moved to a dead-letter stream once `attempts` is
//! exhausted, matching the `removeOnComplete`/backoff vocabulary of §6.

mod error;

pub use error::Error;

use async_trait::async_trait;
use models::JobId;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

const STREAM_KEY: &str = "watermark:jobs";
const DEAD_LETTER_KEY: &str = "watermark:jobs:dead";
const DELAY_KEY: &str = "watermark:jobs:delayed";
const GROUP: &str = "workers";

const INITIAL_BACKOFF: Duration = Duration::from_secs(5);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QueueMessage {
    pub job_id: JobId,
    pub attempt: u32,
}

/// A delivered message, carrying the stream entry ID needed to ack/nack it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub entry_id: String,
    pub message: QueueMessage,
}

#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, job_id: &JobId) -> Result<(), Error>;

    /// Reads up to `count` undelivered messages for `consumer`, blocking up
    /// to `block` if the stream is empty.
    async fn dequeue(
        &self,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<Delivery>, Error>;

    async fn ack(&self, delivery: &Delivery) -> Result<(), Error>;

    /// Fails a delivery: reschedules it with exponential backoff if
    /// `message.attempt` hasn't exhausted `max_attempts`, otherwise moves it
    /// to the dead-letter stream. Always acks the original delivery so it
    /// leaves the group's pending-entries list.
    async fn nack(&self, delivery: Delivery, max_attempts: u32) -> Result<(), Error>;

    /// Re-queues stream entries whose consumer has held them past `idle`
    /// without acking (a crashed worker), and promotes any delayed
    /// messages whose backoff has elapsed back onto the stream. Intended
    /// to run on a timer alongside the dequeue loop.
    async fn reclaim(&self, consumer: &str, idle: Duration) -> Result<(), Error>;

    async fn dead_letter_depth(&self) -> Result<u64, Error>;
}

#[derive(Clone)]
pub struct RedisWorkQueue {
    conn: ConnectionManager,
}

impl RedisWorkQueue {
    pub async fn connect(redis_url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(redis_url)?;
        let mut conn = ConnectionManager::new(client).await?;
        ensure_group(&mut conn).await?;
        Ok(Self { conn })
    }

    fn backoff_for(attempt: u32) -> Duration {
        let scaled = INITIAL_BACKOFF.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        std::cmp::min(scaled, MAX_BACKOFF)
    }
}

async fn ensure_group(conn: &mut ConnectionManager) -> Result<(), Error> {
    let result: redis::RedisResult<()> = redis::cmd("XGROUP")
        .arg("CREATE")
        .arg(STREAM_KEY)
        .arg(GROUP)
        .arg("$")
        .arg("MKSTREAM")
        .query_async(conn)
        .await;
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn unix_ms_now() -> Result<i64, Error> {
    Ok(chrono::Utc::now().timestamp_millis())
}

#[async_trait]
impl WorkQueue for RedisWorkQueue {
    async fn enqueue(&self, job_id: &JobId) -> Result<(), Error> {
        let message = QueueMessage {
            job_id: job_id.clone(),
            attempt: 0,
        };
        let payload = serde_json::to_string(&message)?;
        let mut conn = self.conn.clone();
        let _: String = conn
            .xadd(STREAM_KEY, "*", &[("payload", payload.as_str())])
            .await?;
        Ok(())
    }

    async fn dequeue(
        &self,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<Delivery>, Error> {
        let mut conn = self.conn.clone();
        let opts = redis::streams::StreamReadOptions::default()
            .group(GROUP, consumer)
            .count(count)
            .block(block.as_millis() as usize);

        let reply: redis::streams::StreamReadReply = conn
            .xread_options(&[STREAM_KEY], &[">"], &opts)
            .await?;

        let mut deliveries = Vec::new();
        for stream_key in reply.keys {
            for entry in stream_key.ids {
                let Some(payload) = entry.map.get("payload") else {
                    continue;
                };
                let redis::Value::BulkString(bytes) = payload else {
                    continue;
                };
                match serde_json::from_slice::<QueueMessage>(bytes) {
                    Ok(message) => deliveries.push(Delivery {
                        entry_id: entry.id,
                        message,
                    }),
                    Err(e) => {
                        tracing::warn!(entry_id = %entry.id, error = %e, "dropping malformed queue entry");
                        let _: () = conn.xack(STREAM_KEY, GROUP, &[entry.id]).await?;
                    }
                }
            }
        }
        Ok(deliveries)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        let _: () = conn.xack(STREAM_KEY, GROUP, &[delivery.entry_id.as_str()]).await?;
        Ok(())
    }

    async fn nack(&self, delivery: Delivery, max_attempts: u32) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        let _: () = conn.xack(STREAM_KEY, GROUP, &[delivery.entry_id.as_str()]).await?;

        let next_attempt = delivery.message.attempt + 1;
        if next_attempt >= max_attempts {
            let payload = serde_json::to_string(&delivery.message)?;
            let _: String = conn
                .xadd(DEAD_LETTER_KEY, "*", &[("payload", payload.as_str())])
                .await?;
            tracing::warn!(job_id = %delivery.message.job_id, attempts = next_attempt, "job moved to dead letter");
            return Ok(());
        }

        let retried = QueueMessage {
            job_id: delivery.message.job_id,
            attempt: next_attempt,
        };
        let payload = serde_json::to_string(&retried)?;
        // `backoff_for` is 0-indexed by completed attempts, so the first
        // retry (next_attempt == 1) gets the un-doubled 5s delay.
        let ready_at = unix_ms_now()? + Self::backoff_for(delivery.message.attempt).as_millis() as i64;
        let _: () = conn.zadd(DELAY_KEY, payload, ready_at).await?;
        Ok(())
    }

    async fn reclaim(&self, consumer: &str, idle: Duration) -> Result<(), Error> {
        let mut conn = self.conn.clone();

        // Promote delayed (backed-off) messages whose wait has elapsed.
        let now = unix_ms_now()?;
        let due: Vec<String> = conn.zrangebyscore(DELAY_KEY, 0, now).await?;
        for payload in due {
            let _: String = conn
                .xadd(STREAM_KEY, "*", &[("payload", payload.as_str())])
                .await?;
            let _: () = conn.zrem(DELAY_KEY, payload).await?;
        }

        // Claim stream entries abandoned by a dead consumer so another
        // worker can pick them up (XAUTOCLAIM does the scan + claim in one
        // round trip).
        let _: (String, redis::streams::StreamClaimReply, Vec<String>) = redis::cmd("XAUTOCLAIM")
            .arg(STREAM_KEY)
            .arg(GROUP)
            .arg(consumer)
            .arg(idle.as_millis() as usize)
            .arg("0-0")
            .arg("COUNT")
            .arg(100)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn dead_letter_depth(&self) -> Result<u64, Error> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.xlen(DEAD_LETTER_KEY).await?;
        Ok(len)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(RedisWorkQueue::backoff_for(0), Duration::from_secs(5));
        assert_eq!(RedisWorkQueue::backoff_for(1), Duration::from_secs(10));
        assert_eq!(RedisWorkQueue::backoff_for(2), Duration::from_secs(20));
        assert_eq!(RedisWorkQueue::backoff_for(10), MAX_BACKOFF);
    }
}
