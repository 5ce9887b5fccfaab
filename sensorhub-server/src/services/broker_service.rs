use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use sensorhub_api::models::LedState;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::configs::{Broker, BrokerTopic};
use crate::services::{CommandPublisher, IngestService, PublishOutcome};

const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// The process-wide broker connection. Feeds the ingest router and carries
/// LED commands out.
pub struct BrokerService {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    topic: BrokerTopic,
    shutdown: watch::Sender<bool>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl BrokerService {
    /// Returns immediately. The spawned event loop task owns connecting,
    /// subscribing and reconnecting until [`BrokerService::shutdown`].
    pub fn start(broker: Broker, ingest_service: Arc<IngestService>) -> Self {
        let client_id = format!("{}_{}", broker.client_id_prefix, Uuid::new_v4().simple());

        let mut options = MqttOptions::new(&client_id, &broker.host, broker.port);
        options.set_keep_alive(broker.keep_alive());
        options.set_clean_session(true);

        let (client, event_loop) = AsyncClient::new(options, 10);
        let connected = Arc::new(AtomicBool::new(false));
        let (shutdown, shutdown_receiver) = watch::channel(false);
        let topic = broker.topic.clone();

        tracing::info!("connecting to MQTT broker {}:{} as {}", broker.host, broker.port, client_id);

        let event_loop = tokio::spawn(Self::run_event_loop(
            event_loop,
            client.clone(),
            Arc::clone(&connected),
            broker,
            ingest_service,
            shutdown_receiver,
        ));

        Self {
            client,
            connected,
            topic,
            shutdown,
            event_loop: Mutex::new(Some(event_loop)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Stops the event loop and waits for it to finish, sending a DISCONNECT
    /// first when connected.
    pub async fn shutdown(&self) {
        if self.shutdown.send(true).is_err() {
            tracing::debug!("MQTT event loop already stopped");
        }

        let Some(event_loop) = self.event_loop.lock().await.take() else {
            return;
        };

        if let Err(e) = event_loop.await {
            tracing::error!("MQTT event loop task failed: {}", e);
        }
    }

    async fn run_event_loop(
        mut event_loop: EventLoop,
        client: AsyncClient,
        connected: Arc<AtomicBool>,
        broker: Broker,
        ingest_service: Arc<IngestService>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if connected.load(Ordering::SeqCst) {
                        Self::disconnect(&mut event_loop, &client).await;
                    }
                    break;
                }
                event = event_loop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        connected.store(true, Ordering::SeqCst);
                        tracing::info!("connected to MQTT broker");

                        // Clean sessions lose subscriptions, so renew them on every connect
                        for topic in [&broker.topic.sensor_data, &broker.topic.led_control] {
                            match client.try_subscribe(topic, QoS::AtMostOnce) {
                                Ok(()) => tracing::info!("subscribe topic {}", topic),
                                Err(e) => tracing::error!("failed to subscribe topic {}: {}", topic, e),
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        tracing::debug!("subscription acknowledged");
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let ingest_service = Arc::clone(&ingest_service);

                        // Writes are not awaited in arrival order
                        tokio::spawn(async move {
                            ingest_service.handle_message(&publish.topic, &publish.payload).await;
                        });
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        connected.store(false, Ordering::SeqCst);
                        tracing::warn!("broker closed the connection");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        connected.store(false, Ordering::SeqCst);
                        tracing::error!("MQTT connection error: {}", e);

                        tokio::select! {
                            _ = shutdown.changed() => break,
                            _ = tokio::time::sleep(broker.reconnect_interval()) => {
                                tracing::debug!("reconnecting to MQTT broker");
                            }
                        }
                    }
                }
            }
        }

        connected.store(false, Ordering::SeqCst);
        tracing::info!("MQTT client disconnected");
    }

    async fn disconnect(event_loop: &mut EventLoop, client: &AsyncClient) {
        if let Err(e) = client.try_disconnect() {
            tracing::warn!("failed to request MQTT disconnect: {}", e);
            return;
        }

        let flushed = tokio::time::timeout(DISCONNECT_TIMEOUT, async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;

        if flushed.is_err() {
            tracing::warn!("timed out sending MQTT disconnect");
        }
    }
}

#[async_trait]
impl CommandPublisher for BrokerService {
    async fn publish_led(&self, state: LedState) -> PublishOutcome {
        if !self.is_connected() {
            tracing::error!("MQTT client not connected, drop LED command {}", state);
            return PublishOutcome::Disconnected;
        }

        match self
            .client
            .try_publish(&self.topic.led_control, QoS::AtMostOnce, false, state.command())
        {
            Ok(()) => {
                tracing::info!("publish LED command {} to {}", state.command(), self.topic.led_control);
                PublishOutcome::Published
            }
            Err(e) => {
                tracing::error!("failed to publish LED command: {}", e);
                PublishOutcome::Rejected
            }
        }
    }
}
