use std::time::Duration;

use rumqttc::{AsyncClient, Event, Outgoing, Packet, QoS};
use strum::Display;
use tokio::{sync::watch, time::sleep};
use waterwise_codec::{LiveMessage, Topics};
use waterwise_types::PumpStatus;

use crate::{MqttConfig, display::MonitorView};

/// Moisture shown before the first reading arrives.
const INITIAL_MOISTURE: i32 = 20;

/// How long teardown waits for the DISCONNECT packet to go out.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Inputs that move the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Connect,
    ConnAck,
    TransportFailure,
    Teardown,
}

impl ConnectionState {
    pub fn on(self, signal: Signal) -> Self {
        use ConnectionState::*;

        match (self, signal) {
            (_, Signal::Teardown) => Disconnected,
            (Disconnected, Signal::Connect) => Connecting,
            (Connecting, Signal::ConnAck) => Connected,
            (Connecting | Connected, Signal::TransportFailure) => Connecting,
            (state, _) => state,
        }
    }
}

/// Owner of the live display cells.
///
/// Each cell holds only the latest value. The monitor is the single writer;
/// readers get a [`MonitorHandle`].
pub struct LiveMonitor {
    topics: Topics,
    state: watch::Sender<ConnectionState>,
    moisture: watch::Sender<i32>,
    pump: watch::Sender<PumpStatus>,
}

#[derive(Debug, Clone)]
pub struct MonitorHandle {
    pub state: watch::Receiver<ConnectionState>,
    pub moisture: watch::Receiver<i32>,
    pub pump: watch::Receiver<PumpStatus>,
}

impl MonitorHandle {
    pub fn view(&self) -> MonitorView {
        MonitorView::new(
            *self.state.borrow(),
            *self.moisture.borrow(),
            self.pump.borrow().clone(),
        )
    }

    /// Waits until any of the three cells changes. Returns `false` once the
    /// monitor is gone.
    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            result = self.state.changed() => result.is_ok(),
            result = self.moisture.changed() => result.is_ok(),
            result = self.pump.changed() => result.is_ok(),
        }
    }
}

impl LiveMonitor {
    pub fn new(topics: Topics) -> Self {
        Self {
            topics,
            state: watch::Sender::new(ConnectionState::Disconnected),
            moisture: watch::Sender::new(INITIAL_MOISTURE),
            pump: watch::Sender::new(PumpStatus::Off),
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            state: self.state.subscribe(),
            moisture: self.moisture.subscribe(),
            pump: self.pump.subscribe(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn signal(&self, signal: Signal) -> ConnectionState {
        let current = self.state();
        let next = current.on(signal);
        if next != current {
            debug!("MQTT state {current} -> {next}");
            self.state.send_replace(next);
        }
        next
    }

    /// Applies one incoming publish to the display cells.
    pub fn handle_publish(&self, topic: &str, payload: &[u8]) -> Option<LiveMessage> {
        let message = match LiveMessage::decode(&self.topics, topic, payload) {
            Ok(Some(message)) => message,
            Ok(None) => {
                trace!("ignoring message on {topic}");
                return None;
            }
            Err(error) => {
                warn!("bad payload on {topic}: {error}");
                return None;
            }
        };

        match &message {
            LiveMessage::Moisture(level) => {
                self.moisture.send_replace(*level);
            }
            LiveMessage::Pump(status) => {
                self.pump.send_replace(status.clone());
            }
        }

        Some(message)
    }
}

/// Drives the MQTT connection until `shutdown` flips or its sender is dropped.
///
/// Connection failures never end the loop: the event loop reconnects on the
/// next poll after `reconnect_delay`.
pub async fn run_monitor(
    config: &MqttConfig,
    monitor: &LiveMonitor,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let (client, mut eventloop) = AsyncClient::new(config.options(), 10);

    info!("MQTT connecting to {}:{}...", config.host, config.port);
    monitor.signal(Signal::Connect);

    loop {
        if *shutdown.borrow() {
            break;
        }

        let event = tokio::select! {
            _ = shutdown.changed() => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("MQTT connected.");
                monitor.signal(Signal::ConnAck);

                for topic in [&monitor.topics().moisture, &monitor.topics().pump] {
                    if let Err(error) = client.subscribe(topic.as_str(), QoS::AtMostOnce).await {
                        error!("MQTT subscribe to {topic} failed: {error}");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                monitor.handle_publish(&publish.topic, &publish.payload);
            }
            Ok(_) => {}
            Err(error) => {
                match monitor.state() {
                    ConnectionState::Connected => warn!("MQTT connection lost: {error}"),
                    _ => error!("MQTT connection failed: {error}"),
                }
                monitor.signal(Signal::TransportFailure);

                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = sleep(config.reconnect_delay) => {}
                }
            }
        }
    }

    if monitor.state() == ConnectionState::Connected {
        disconnect(&client, &mut eventloop).await;
    }

    monitor.signal(Signal::Teardown);
    info!("MQTT disconnected.");
    Ok(())
}

async fn disconnect(client: &AsyncClient, eventloop: &mut rumqttc::EventLoop) {
    if let Err(error) = client.disconnect().await {
        warn!("MQTT disconnect request failed: {error}");
        return;
    }

    let flush = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    if tokio::time::timeout(DISCONNECT_TIMEOUT, flush).await.is_err() {
        warn!("MQTT disconnect timed out");
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };
    use waterwise_types::Band;

    use super::*;

    const CONNECT: u8 = 1;
    const SUBSCRIBE: u8 = 8;
    const PINGREQ: u8 = 12;
    const DISCONNECT: u8 = 14;

    /// Reads one MQTT control packet, returning its type and body.
    async fn read_packet(socket: &mut TcpStream) -> std::io::Result<(u8, Vec<u8>)> {
        let header = socket.read_u8().await?;

        let mut length = 0_usize;
        let mut shift = 0;
        loop {
            let byte = socket.read_u8().await?;
            length |= usize::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }

        let mut body = vec![0; length];
        socket.read_exact(&mut body).await?;
        Ok((header >> 4, body))
    }

    fn publish_packet(topic: &str, payload: &str) -> Vec<u8> {
        let mut packet = vec![0x30, (2 + topic.len() + payload.len()) as u8];
        packet.extend_from_slice(&(topic.len() as u16).to_be_bytes());
        packet.extend_from_slice(topic.as_bytes());
        packet.extend_from_slice(payload.as_bytes());
        packet
    }

    /// Accepts one client, acknowledges its session and both subscriptions,
    /// then publishes `level` on the moisture topic.
    async fn broker_session(broker: &TcpListener, level: &str) -> (TcpStream, Vec<String>) {
        let (mut socket, _) = broker.accept().await.unwrap();

        let (kind, _) = read_packet(&mut socket).await.unwrap();
        assert_eq!(kind, CONNECT);
        socket.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();

        let mut topics = Vec::new();
        while topics.len() < 2 {
            let (kind, body) = read_packet(&mut socket).await.unwrap();
            if kind != SUBSCRIBE {
                continue;
            }

            let len = usize::from(u16::from_be_bytes([body[2], body[3]]));
            topics.push(String::from_utf8(body[4..4 + len].to_vec()).unwrap());
            socket
                .write_all(&[0x90, 0x03, body[0], body[1], 0x00])
                .await
                .unwrap();
        }

        socket
            .write_all(&publish_packet(Topics::DEFAULT_MOISTURE, level))
            .await
            .unwrap();

        topics.sort();
        (socket, topics)
    }

    #[test]
    fn state_machine_transitions() {
        use ConnectionState::*;

        assert_eq!(Disconnected.on(Signal::Connect), Connecting);
        assert_eq!(Connecting.on(Signal::ConnAck), Connected);
        assert_eq!(Connected.on(Signal::TransportFailure), Connecting);
        assert_eq!(Connecting.on(Signal::TransportFailure), Connecting);
        assert_eq!(Connected.on(Signal::Teardown), Disconnected);
        assert_eq!(Connecting.on(Signal::Teardown), Disconnected);
    }

    #[test]
    fn state_machine_ignores_out_of_order_signals() {
        use ConnectionState::*;

        assert_eq!(Disconnected.on(Signal::ConnAck), Disconnected);
        assert_eq!(Disconnected.on(Signal::TransportFailure), Disconnected);
        assert_eq!(Connected.on(Signal::Connect), Connected);
        assert_eq!(Connected.on(Signal::ConnAck), Connected);
    }

    #[test]
    fn publishes_update_cells() {
        let monitor = LiveMonitor::new(Topics::default());
        let handle = monitor.handle();

        assert_eq!(*handle.moisture.borrow(), INITIAL_MOISTURE);
        assert_eq!(*handle.pump.borrow(), PumpStatus::Off);

        monitor.handle_publish(Topics::DEFAULT_MOISTURE, b"12");
        monitor.handle_publish(Topics::DEFAULT_MOISTURE, b"35");
        monitor.handle_publish(Topics::DEFAULT_PUMP, b"ON");

        assert_eq!(*handle.moisture.borrow(), 35);
        assert_eq!(*handle.pump.borrow(), PumpStatus::On);
    }

    #[test]
    fn bad_or_foreign_messages_keep_last_value() {
        let monitor = LiveMonitor::new(Topics::default());
        let handle = monitor.handle();
        monitor.handle_publish(Topics::DEFAULT_MOISTURE, b"28");

        assert_eq!(monitor.handle_publish(Topics::DEFAULT_MOISTURE, b"dry"), None);
        assert_eq!(monitor.handle_publish("smart/watering/other", b"99"), None);
        assert_eq!(*handle.moisture.borrow(), 28);
    }

    #[test]
    fn view_is_loading_until_connected() {
        let monitor = LiveMonitor::new(Topics::default());
        let handle = monitor.handle();

        monitor.signal(Signal::Connect);
        assert_eq!(handle.view(), MonitorView::Loading);

        monitor.signal(Signal::ConnAck);
        monitor.handle_publish(Topics::DEFAULT_MOISTURE, b"31");
        assert_eq!(
            handle.view(),
            MonitorView::Live {
                moisture: 31,
                band: Band::High,
                pump: PumpStatus::Off,
            }
        );

        monitor.signal(Signal::TransportFailure);
        assert_eq!(handle.view(), MonitorView::Loading);
    }

    #[tokio::test]
    async fn handle_wakes_on_change() {
        let monitor = LiveMonitor::new(Topics::default());
        let mut handle = monitor.handle();

        monitor.handle_publish(Topics::DEFAULT_PUMP, b"ON");
        assert!(handle.changed().await);

        drop(monitor);
        assert!(!handle.changed().await);
    }

    #[tokio::test]
    async fn run_monitor_stops_on_shutdown() {
        let mut config = MqttConfig::new("127.0.0.1", 1);
        config.use_tls = false;
        config.reconnect_delay = Duration::from_millis(10);

        let monitor = LiveMonitor::new(Topics::default());
        let (stop, shutdown) = watch::channel(false);

        let stopper = async {
            sleep(Duration::from_millis(50)).await;
            stop.send_replace(true);
        };
        let (result, _) = tokio::join!(run_monitor(&config, &monitor, shutdown), stopper);

        assert!(result.is_ok());
        assert_eq!(monitor.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn run_monitor_resubscribes_and_disconnects() {
        let broker = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = broker.local_addr().unwrap().port();

        let mut config = MqttConfig::new("127.0.0.1", port);
        config.use_tls = false;
        config.reconnect_delay = Duration::from_millis(10);

        let monitor = LiveMonitor::new(Topics::default());
        let mut moisture = monitor.handle().moisture;
        let (stop, shutdown) = watch::channel(false);

        let script = tokio::spawn(async move {
            let (first, first_topics) = broker_session(&broker, "12").await;
            drop(first);

            let (mut second, second_topics) = broker_session(&broker, "17").await;
            let last = loop {
                let (kind, _) = read_packet(&mut second).await.unwrap();
                match kind {
                    PINGREQ => second.write_all(&[0xd0, 0x00]).await.unwrap(),
                    DISCONNECT => break kind,
                    _ => {}
                }
            };

            (first_topics, second_topics, last)
        });

        let controller = async {
            let reached = moisture.wait_for(|level| *level == 17).await.is_ok();
            let state = monitor.state();
            stop.send_replace(true);
            (reached, state)
        };

        let (result, (reached, state)) = tokio::time::timeout(
            Duration::from_secs(10),
            async { tokio::join!(run_monitor(&config, &monitor, shutdown), controller) },
        )
        .await
        .unwrap();

        assert!(result.is_ok());
        assert!(reached);
        assert_eq!(state, ConnectionState::Connected);
        assert_eq!(monitor.state(), ConnectionState::Disconnected);
        assert_eq!(*monitor.handle().moisture.borrow(), 17);

        let (first_topics, second_topics, last) =
            tokio::time::timeout(Duration::from_secs(5), script)
                .await
                .unwrap()
                .unwrap();
        let expected = vec![
            Topics::DEFAULT_MOISTURE.to_string(),
            Topics::DEFAULT_PUMP.to_string(),
        ];
        assert_eq!(first_topics, expected);
        assert_eq!(second_topics, expected);
        assert_eq!(last, DISCONNECT);
    }
}
