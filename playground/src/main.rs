//! Interactive exercise of the library against a real bus: say hello to
//! the system bus and list the names on it.

use dbus_wire::Body;
use dbus_wire::Config;
use dbus_wire::Connection;
use dbus_wire::Message;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    smol::block_on(async {
        Connection::scope(Config::system_bus(), |handle, _replies| async move {
            // The bus won't talk to us until we say hello; the reply
            // carries our unique name.
            let hello = Message::method_call(
                Some("org.freedesktop.DBus"),
                "/org/freedesktop/DBus",
                Some("org.freedesktop.DBus"),
                "Hello",
                Body::new(),
            )?;
            let reply = handle.send_with_reply(hello).await?;
            println!("unique name: {:?}", reply.body.arguments);

            let list_names = Message::method_call(
                Some("org.freedesktop.DBus"),
                "/org/freedesktop/DBus",
                Some("org.freedesktop.DBus"),
                "ListNames",
                Body::new(),
            )?;
            let reply = handle.send_with_reply(list_names).await?;
            println!("names on the bus: {:?}", reply.body.arguments);

            Ok(())
        })
        .await
    })?;

    Ok(())
}
