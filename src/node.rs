use alloc::{boxed::Box, vec, vec::Vec};

use core::fmt;

use crate::{
    clock::{Clock, Timestamp},
    name::Name,
    packet::{
        Data, ForwardingEntry, ForwardingFlags, Interest, KeyLocator, SignatureInfo,
        SignatureType,
    },
    tables::{PendingInterestTable, RegisteredPrefixTable},
    tlv::{Encode, Tlv},
    transport::{Transport, TransportError},
};

/// Upper bound on one encoded packet; the receive buffer is this large.
pub const MAX_PACKET_SIZE: usize = 8800;

/// How often pending-interest deadlines are checked.
pub const PIT_CHECK_INTERVAL_MS: u64 = 100;

const PROBE_INTEREST_LIFETIME_MS: u64 = 4000;
const SELF_REGISTRATION_SCOPE: u64 = 1;
const NDND_ID_LEN: usize = 32;

pub type OnData<C, T, M> = Box<dyn FnOnce(&mut Node<C, T, M>, &Interest, &Data)>;
pub type OnTimeout<C, T, M> = Box<dyn FnOnce(&mut Node<C, T, M>, &Interest)>;
pub type OnInterest<C, T, M> = Box<dyn FnMut(&mut Node<C, T, M>, &Name, &Interest, u64)>;
pub type OnRegisterFailed<C, T, M> = Box<dyn FnOnce(&mut Node<C, T, M>, &Name)>;

#[derive(Debug)]
pub enum NodeError {
    Transport(TransportError),
    /// `process_events` was called while the event loop was running.
    AlreadyRunning,
}

impl From<TransportError> for NodeError {
    fn from(err: TransportError) -> Self {
        NodeError::Transport(err)
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Transport(err) => write!(f, "transport error: {err}"),
            NodeError::AlreadyRunning => f.write_str("event loop is already running"),
        }
    }
}

pub trait NodeMetrics {
    fn interest_expressed(&mut self) {}
    fn interest_received(&mut self) {}
    fn interest_dropped(&mut self) {}
    fn interest_timed_out(&mut self) {}

    fn data_received(&mut self) {}
    fn data_delivered(&mut self) {}
    fn data_dropped(&mut self) {}
    fn data_sent(&mut self) {}

    fn invalid_block_received(&mut self) {}

    fn prefix_registered(&mut self) {}
    fn prefix_registration_failed(&mut self) {}
}

pub struct InertMetrics;

impl NodeMetrics for InertMetrics {}

// A registration waiting for the forwarder-id probe to conclude.
struct PendingRegistration<C, T, M>
where
    C: Clock,
    T: Transport,
    M: NodeMetrics,
{
    id: u64,
    prefix: Name,
    on_interest: OnInterest<C, T, M>,
    on_failed: Option<OnRegisterFailed<C, T, M>>,
    flags: ForwardingFlags,
}

enum Inbound {
    Interest(Interest),
    Data(Data),
    Dropped,
}

/// The client node: multiplexes expressed interests and registered
/// prefixes over one connection to the local forwarder.
///
/// Everything runs on the caller's thread. Inbound blocks and timer
/// work are processed by [`poll`](Node::poll), which
/// [`process_events`](Node::process_events) loops over; application
/// callbacks receive `&mut Node` and may re-enter any of the public
/// operations.
pub struct Node<C, T, M = InertMetrics>
where
    C: Clock,
    T: Transport,
    M: NodeMetrics,
{
    clock: C,
    transport: T,
    metrics: M,
    pit: PendingInterestTable<OnData<C, T, M>, OnTimeout<C, T, M>>,
    rpt: RegisteredPrefixTable<OnInterest<C, T, M>>,
    // The forwarder's identity: empty until the probe succeeds, never
    // cleared afterwards.
    ndnd_id: Vec<u8>,
    pending_registrations: Vec<PendingRegistration<C, T, M>>,
    probe_in_flight: bool,
    next_pit_check: Timestamp,
    recv_buffer: Box<[u8]>,
    recv_cursor: usize,
    running: bool,
    stop_requested: bool,
}

impl<C, T, M> Node<C, T, M>
where
    C: Clock,
    T: Transport,
    M: NodeMetrics,
{
    pub fn new(clock: C, transport: T, metrics: M) -> Self {
        let mut clock = clock;
        let now = clock.now();
        Self {
            clock,
            transport,
            metrics,
            pit: PendingInterestTable::new(),
            rpt: RegisteredPrefixTable::new(),
            ndnd_id: Vec::new(),
            pending_registrations: Vec::new(),
            probe_in_flight: false,
            next_pit_check: now.adding(PIT_CHECK_INTERVAL_MS),
            recv_buffer: vec![0u8; MAX_PACKET_SIZE].into_boxed_slice(),
            recv_cursor: 0,
            running: false,
            stop_requested: false,
        }
    }

    /// Sends `interest` to the forwarder and records it in the pending
    /// table, connecting the transport first if needed. Returns the id
    /// to use with [`remove_pending_interest`](Self::remove_pending_interest).
    ///
    /// Exactly one of `on_data` and `on_timeout` will eventually run for
    /// the entry, unless it is cancelled first. A failed send leaves no
    /// entry behind.
    pub fn express_interest(
        &mut self,
        interest: Interest,
        on_data: Option<OnData<C, T, M>>,
        on_timeout: Option<OnTimeout<C, T, M>>,
    ) -> Result<u64, NodeError> {
        self.ensure_connected()?;
        let wire = interest.to_vec();
        let now = self.clock.now();
        let id = self.pit.insert(interest, on_data, on_timeout, now);
        if let Err(err) = self.transport.try_send(&wire) {
            self.pit.remove_by_id(id);
            return Err(err.into());
        }
        self.metrics.interest_expressed();
        Ok(id)
    }

    /// Cancels a pending interest. Idempotent: once the entry has fired
    /// or was already removed this does nothing.
    pub fn remove_pending_interest(&mut self, id: u64) {
        self.pit.remove_by_id(id);
    }

    /// Asks the forwarder to deliver interests under `prefix` and
    /// records the handler. The returned id is valid immediately, even
    /// while the forwarder handshake is still in flight.
    ///
    /// If the forwarder's identity is not known yet it is fetched with a
    /// probe interest first; registrations arriving in the meantime are
    /// queued behind the same probe. A probe timeout reports
    /// `on_register_failed` once per queued prefix and registers
    /// nothing.
    pub fn register_prefix(
        &mut self,
        prefix: Name,
        on_interest: OnInterest<C, T, M>,
        on_register_failed: Option<OnRegisterFailed<C, T, M>>,
        flags: ForwardingFlags,
    ) -> Result<u64, NodeError> {
        self.ensure_connected()?;
        let id = self.rpt.allocate_id();

        if !self.ndnd_id.is_empty() {
            self.finish_registration(id, prefix, on_interest, flags)?;
            return Ok(id);
        }

        self.pending_registrations.push(PendingRegistration {
            id,
            prefix,
            on_interest,
            on_failed: on_register_failed,
            flags,
        });
        if !self.probe_in_flight {
            if let Err(err) = self.express_probe() {
                self.pending_registrations.pop();
                return Err(err);
            }
        }
        Ok(id)
    }

    /// Withdraws a registered prefix handler. Idempotent.
    pub fn remove_registered_prefix(&mut self, id: u64) {
        self.rpt.remove_by_id(id);
    }

    /// Encodes and sends a data packet; interest handlers use this to
    /// answer.
    pub fn send_data(&mut self, data: &Data) -> Result<(), NodeError> {
        self.ensure_connected()?;
        self.transport.try_send(&data.to_vec())?;
        self.metrics.data_sent();
        Ok(())
    }

    /// Runs the event loop until [`shutdown`](Self::shutdown) is called.
    /// Fails with [`NodeError::AlreadyRunning`] when invoked from inside
    /// a callback.
    pub fn process_events(&mut self) -> Result<(), NodeError> {
        if self.running {
            return Err(NodeError::AlreadyRunning);
        }
        self.running = true;
        self.stop_requested = false;
        let result = self.run_loop();
        self.running = false;
        result
    }

    /// Closes the transport and asks the event loop to stop.
    /// Outstanding pending interests and queued registrations are
    /// dropped without firing their callbacks.
    pub fn shutdown(&mut self) {
        self.stop_requested = true;
        self.transport.close();
        self.pit.clear();
        self.pending_registrations.clear();
        self.probe_in_flight = false;
    }

    /// Makes one unit of progress: processes at most one complete
    /// inbound block, then any due timer work. Returns whether anything
    /// happened. Embedders with their own loop can drive this directly
    /// instead of [`process_events`](Self::process_events).
    pub fn poll(&mut self) -> Result<bool, NodeError> {
        let mut progressed = self.pump_inbound()?;
        progressed |= self.check_pit_expire();
        Ok(progressed)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The forwarder's identity; empty until the first registration
    /// probe has succeeded.
    pub fn ndnd_id(&self) -> &[u8] {
        &self.ndnd_id
    }

    fn ensure_connected(&mut self) -> Result<(), TransportError> {
        if !self.transport.is_connected() {
            self.transport.connect()?;
        }
        Ok(())
    }

    fn run_loop(&mut self) -> Result<(), NodeError> {
        while !self.stop_requested {
            if self.poll()? {
                continue;
            }
            let now = self.clock.now();
            let wait = self
                .next_pit_check
                .difference(&now)
                .unwrap_or(0)
                .min(PIT_CHECK_INTERVAL_MS);
            if wait > 0 {
                self.transport.wait_readable(wait);
            }
        }
        Ok(())
    }

    fn pump_inbound(&mut self) -> Result<bool, NodeError> {
        if !self.transport.is_connected() {
            return Ok(false);
        }

        // A complete block may already be buffered from the previous
        // read; only hit the transport when it is not.
        let mut should_recv = true;
        if self.recv_cursor > 0 {
            match Tlv::try_decode(&self.recv_buffer[..self.recv_cursor]) {
                Ok(_) => should_recv = false,
                Err(err) if err.needs_more_bytes() => {}
                Err(err) => {
                    log::warn!("inbound framing error: {err:?}");
                    self.metrics.invalid_block_received();
                    self.recv_cursor = 0;
                    return Ok(false);
                }
            }
        }

        if should_recv {
            let received = self
                .transport
                .try_recv(&mut self.recv_buffer[self.recv_cursor..])?;
            if received == 0 {
                return Ok(false);
            }
            self.recv_cursor += received;
        }

        let (inbound, consumed) = {
            let bytes = &self.recv_buffer[..self.recv_cursor];
            match Tlv::try_decode(bytes) {
                Ok((tlv, tlv_len)) => {
                    let inbound = match tlv.typ.get() {
                        Interest::TLV_TYPE => match Interest::try_decode(tlv.val) {
                            Some(interest) => Inbound::Interest(interest),
                            None => {
                                log::warn!("dropping malformed interest block");
                                self.metrics.invalid_block_received();
                                Inbound::Dropped
                            }
                        },
                        Data::TLV_TYPE => match Data::try_decode(tlv.val) {
                            Some(data) => Inbound::Data(data),
                            None => {
                                log::warn!("dropping malformed data block");
                                self.metrics.invalid_block_received();
                                Inbound::Dropped
                            }
                        },
                        other => {
                            log::debug!("ignoring inbound block of type {other}");
                            Inbound::Dropped
                        }
                    };
                    (inbound, tlv_len)
                }
                Err(err) if err.needs_more_bytes() => {
                    if self.recv_cursor == self.recv_buffer.len() {
                        // The block can never fit; dropping the buffer
                        // and hoping to resynchronise is the best a
                        // stream can do.
                        log::warn!(
                            "inbound block larger than {MAX_PACKET_SIZE} bytes, resetting framing"
                        );
                        self.metrics.invalid_block_received();
                        self.recv_cursor = 0;
                    }
                    return Ok(false);
                }
                Err(err) => {
                    log::warn!("inbound framing error: {err:?}");
                    self.metrics.invalid_block_received();
                    self.recv_cursor = 0;
                    return Ok(false);
                }
            }
        };

        if consumed < self.recv_cursor {
            self.recv_buffer.copy_within(consumed..self.recv_cursor, 0);
            self.recv_cursor -= consumed;
        } else {
            self.recv_cursor = 0;
        }

        match inbound {
            Inbound::Interest(interest) => self.dispatch_interest(interest),
            Inbound::Data(data) => self.dispatch_data(data),
            Inbound::Dropped => {}
        }
        Ok(true)
    }

    fn dispatch_interest(&mut self, interest: Interest) {
        self.metrics.interest_received();
        let matched = self
            .rpt
            .longest_match(&interest.name)
            .map(|entry| entry.id());
        let Some(id) = matched else {
            log::debug!("no registered prefix for interest {}", interest.name);
            self.metrics.interest_dropped();
            return;
        };
        let Some((prefix, mut on_interest)) = self.rpt.take_handler(id) else {
            self.metrics.interest_dropped();
            return;
        };
        isolate(|| on_interest(self, &prefix, &interest, id));
        self.rpt.restore_handler(id, on_interest);
    }

    fn dispatch_data(&mut self, data: Data) {
        self.metrics.data_received();
        let Some(entry) = self.pit.take_match(&data.name) else {
            log::debug!("dropping unsolicited data {}", data.name);
            self.metrics.data_dropped();
            return;
        };
        // The entry leaves the table before the callback runs, so the
        // callback may re-express the same interest without racing its
        // own dead entry.
        let interest = entry.interest;
        if let Some(on_data) = entry.on_data {
            isolate(|| on_data(self, &interest, &data));
        }
        self.metrics.data_delivered();
    }

    fn check_pit_expire(&mut self) -> bool {
        let mut now = self.clock.now();
        if now < self.next_pit_check {
            return false;
        }

        // Entries inserted by timeout callbacks get ids above the bound
        // and are left for a later tick.
        let id_bound = self.pit.last_issued_id();
        while let Some(entry) = self.pit.take_first_expired(now, id_bound) {
            self.metrics.interest_timed_out();
            let interest = entry.interest;
            if let Some(on_timeout) = entry.on_timeout {
                isolate(|| on_timeout(self, &interest));
            }
            // Re-read the clock: a slow callback must not hide entries
            // that expired while it ran.
            now = self.clock.now();
        }
        self.next_pit_check = now.adding(PIT_CHECK_INTERVAL_MS);
        true
    }

    fn express_probe(&mut self) -> Result<(), NodeError> {
        let mut interest = Interest::new(probe_name());
        interest.lifetime_ms = Some(PROBE_INTEREST_LIFETIME_MS);

        let on_data: OnData<C, T, M> = Box::new(|node, _interest, data| {
            node.probe_concluded(extract_ndnd_id(data));
        });
        let on_timeout: OnTimeout<C, T, M> = Box::new(|node, _interest| {
            node.probe_concluded(None);
        });

        self.probe_in_flight = true;
        match self.express_interest(interest, Some(on_data), Some(on_timeout)) {
            Ok(_) => Ok(()),
            Err(err) => {
                self.probe_in_flight = false;
                Err(err)
            }
        }
    }

    fn probe_concluded(&mut self, ndnd_id: Option<Vec<u8>>) {
        self.probe_in_flight = false;
        let pending = core::mem::take(&mut self.pending_registrations);
        match ndnd_id {
            Some(bytes) => {
                log::debug!("forwarder id resolved ({} bytes)", bytes.len());
                self.ndnd_id = bytes;
                for registration in pending {
                    let PendingRegistration {
                        id,
                        prefix,
                        on_interest,
                        on_failed,
                        flags,
                    } = registration;
                    if self
                        .finish_registration(id, prefix.clone(), on_interest, flags)
                        .is_err()
                    {
                        self.report_registration_failure(on_failed, &prefix);
                    }
                }
            }
            None => {
                log::warn!(
                    "forwarder id probe failed; failing {} queued registration(s)",
                    pending.len()
                );
                for registration in pending {
                    let PendingRegistration {
                        prefix, on_failed, ..
                    } = registration;
                    self.report_registration_failure(on_failed, &prefix);
                }
            }
        }
    }

    // Inserts the handler before sending so a reply racing the send
    // cannot miss it.
    fn finish_registration(
        &mut self,
        id: u64,
        prefix: Name,
        on_interest: OnInterest<C, T, M>,
        flags: ForwardingFlags,
    ) -> Result<(), NodeError> {
        let interest = self.self_registration_interest(&prefix, flags);
        let wire = interest.to_vec();
        self.rpt.insert_with_id(id, prefix, on_interest);
        if let Err(err) = self.transport.try_send(&wire) {
            self.rpt.remove_by_id(id);
            return Err(err.into());
        }
        self.metrics.prefix_registered();
        Ok(())
    }

    fn report_registration_failure(
        &mut self,
        on_failed: Option<OnRegisterFailed<C, T, M>>,
        prefix: &Name,
    ) {
        log::warn!("prefix registration failed for {prefix}");
        self.metrics.prefix_registration_failed();
        if let Some(on_failed) = on_failed {
            isolate(|| on_failed(self, prefix));
        }
    }

    fn self_registration_interest(&self, prefix: &Name, flags: ForwardingFlags) -> Interest {
        let entry = ForwardingEntry {
            action: "selfreg".into(),
            prefix: prefix.clone(),
            face_id: None,
            flags,
            freshness_period_ms: None,
        };

        // The entry travels as the content of a data packet carrying the
        // historical empty SHA256-with-RSA signature; forwarders of this
        // vintage do not verify it.
        let mut payload = Data::new(Name::new());
        payload.content = Some(entry.to_vec().into_boxed_slice());
        payload.signature_info = SignatureInfo {
            signature_type: SignatureType::Sha256WithRsa,
            key_locator: None,
        };

        let mut name = Name::new();
        name.append(b"ndnx");
        name.append(&self.ndnd_id);
        name.append(b"selfreg");
        name.append(&payload.to_vec());

        let mut interest = Interest::new(name);
        interest.scope = Some(SELF_REGISTRATION_SCOPE);
        interest
    }
}

fn probe_name() -> Name {
    let mut name = Name::new();
    name.append(b"\xC1.M.S.localhost");
    name.append(b"\xC1.M.SRV");
    name.append(b"ndnd");
    name.append(b"KEY");
    name
}

// The forwarder identifies itself through the key digest in the probe
// reply's key locator.
fn extract_ndnd_id(data: &Data) -> Option<Vec<u8>> {
    match &data.signature_info.key_locator {
        Some(KeyLocator::KeyDigest(digest)) if digest.len() == NDND_ID_LEN => {
            Some(digest.to_vec())
        }
        _ => None,
    }
}

// One isolation boundary per callback invocation: a panicking
// application handler must not corrupt the tables or kill the loop.
#[cfg(feature = "std")]
fn isolate(callback: impl FnOnce()) {
    if std::panic::catch_unwind(core::panic::AssertUnwindSafe(callback)).is_err() {
        log::error!("application callback panicked; continuing");
    }
}

#[cfg(not(feature = "std"))]
fn isolate(callback: impl FnOnce()) {
    callback();
}
