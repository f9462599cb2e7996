use mypppoe::{
    ConnectionData, ConnectionLifecycle, ConnectionState, ControlSocket, InterfaceName,
    InterfaceResolver, KernelSockets, PppoeError, SocketFactory,
};

fn loopback() -> InterfaceName {
    InterfaceName::new("lo").unwrap()
}

#[test]
fn init_is_idempotent_and_close_resets() {
    let mut control = ControlSocket::new();
    assert!(!control.is_open());

    let first = control.init().unwrap();
    let second = control.init().unwrap();
    assert_eq!(first, second);
    assert!(control.is_open());

    control.close();
    control.close();
    assert!(!control.is_open());
    assert!(matches!(
        control.resolve_index(&loopback()),
        Err(PppoeError::ControlSocketUnset)
    ));
}

#[test]
fn resolves_loopback_index() {
    let control = ControlSocket::open().unwrap();
    let expected = unsafe { libc::if_nametoindex(c"lo".as_ptr()) };

    assert_ne!(expected, 0);
    assert_eq!(control.resolve_index(&loopback()).unwrap(), expected);
}

#[test]
fn resolves_loopback_hardware_address() {
    let control = ControlSocket::open().unwrap();
    let address = control.resolve_hardware_address(&loopback()).unwrap();

    assert_eq!(address.bytes(), [0u8; 6]);
}

#[test]
fn unknown_interface_is_a_query_error() {
    let control = ControlSocket::open().unwrap();
    let missing = InterfaceName::new("nosuchif0").unwrap();

    match control.resolve_index(&missing) {
        Err(PppoeError::InterfaceQuery { interface, .. }) => {
            assert_eq!(interface.as_ref(), "nosuchif0")
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(control.resolve_hardware_address(&missing).is_err());
}

#[test]
fn set_name_on_loopback_stores_its_address() {
    let lifecycle = ConnectionLifecycle::new(ControlSocket::open().unwrap(), KernelSockets);
    let mut conn = ConnectionData::new();

    lifecycle.set_name(&mut conn, "lo").unwrap();
    assert_eq!(conn.hardware_address().map(|address| address.bytes()), Some([0u8; 6]));

    assert!(lifecycle.set_name(&mut conn, "nosuchif0").is_err());
    assert_eq!(conn.hardware_address().map(|address| address.bytes()), Some([0u8; 6]));
}

#[test]
fn init_on_unknown_interface_leaves_sockets_unset() {
    let control = ControlSocket::open().unwrap();
    let lifecycle = ConnectionLifecycle::new(&control, KernelSockets);
    let mut conn = ConnectionData::new();

    assert!(lifecycle.init(&mut conn, Some("nosuchif0")).is_err());
    assert_eq!(conn.state(), ConnectionState::Uninitialized);
    assert!(conn.protocol_socket().is_none());
    assert!(conn.raw_socket().is_none());

    lifecycle.clear(&mut conn);
    assert_eq!(conn.state(), ConnectionState::Uninitialized);
}

#[test]
#[ignore = "needs CAP_NET_RAW"]
fn raw_socket_binds_to_loopback_discovery_ethertype() {
    let control = ControlSocket::open().unwrap();
    let socket = KernelSockets.create_raw_socket().unwrap();

    let index = KernelSockets
        .bind_to_interface(&socket, &loopback(), &control)
        .unwrap();
    assert_eq!(index, control.resolve_index(&loopback()).unwrap());

    let mut bound: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
    let mut length = std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;
    let ret = unsafe {
        libc::getsockname(
            *socket,
            &mut bound as *mut libc::sockaddr_ll as *mut libc::sockaddr,
            &mut length,
        )
    };
    assert_eq!(ret, 0);
    assert_eq!(bound.sll_family, libc::AF_PACKET as u16);
    assert_eq!(bound.sll_protocol, 0x8863u16.to_be());
    assert_eq!(bound.sll_ifindex, index as i32);
}
