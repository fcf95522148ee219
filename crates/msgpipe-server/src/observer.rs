use crate::connection::Connection;

/// Callback surface for server-side pipe connections.
///
/// Every hook has a default body that keeps the protocol alive: connected
/// and sent re-arm a read, partial data keeps draining the current message.
/// An application implements request/response or streaming protocols by
/// overriding [`on_data_received`](ConnectionObserver::on_data_received)
/// (and [`on_partial_data_received`](ConnectionObserver::on_partial_data_received)
/// if it needs to reassemble oversized messages) while inheriting the
/// connection-lifecycle mechanics.
///
/// One observer instance is shared by every connection of a server; hooks
/// are invoked strictly one at a time on the event-loop thread.
pub trait ConnectionObserver {
    /// A client finished connecting.
    fn on_connected(&mut self, connection: &mut Connection) {
        connection.listen_for_data();
    }

    /// One complete message arrived, or the final chunk of a message that
    /// was previously split across partial notifications. Reassembly across
    /// callbacks is the observer's responsibility, not the connection's.
    ///
    /// The default does nothing; a connection whose observer queues no
    /// operation drains and disconnects.
    fn on_data_received(&mut self, connection: &mut Connection, data: &[u8]) {
        let _ = (connection, data);
    }

    /// The incoming message exceeded the read buffer; `data` is the next
    /// buffer-sized chunk of it.
    fn on_partial_data_received(&mut self, connection: &mut Connection, data: &[u8]) {
        let _ = data;
        connection.listen_for_data();
    }

    /// A queued write completed.
    fn on_data_sent(&mut self, connection: &mut Connection) {
        connection.listen_for_data();
    }
}
