//! Integration tests: the full client against a real TCP server on
//! localhost: connect, endpoint fallback, decoding over the wire, close
//! and shutdown.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use facelink_core::{
    Block, ClientOptions, EyeAngles, FaceLinkError, FaceTracker, Packet, Quat, Vec3,
};

// ── Helpers ──────────────────────────────────────────────────────

const WAIT: Duration = Duration::from_secs(5);

fn ephemeral_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// An address nothing is listening on.
fn refused_addr() -> SocketAddr {
    let (listener, addr) = ephemeral_listener();
    drop(listener);
    addr
}

/// Poll `cond` until it holds or `WAIT` elapses.
fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Accept one client, send `packets`, then hand the stream back so the
/// test controls when it closes.
fn serve_once(listener: TcpListener, packets: Vec<Packet>) -> thread::JoinHandle<TcpStream> {
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        for packet in packets {
            stream.write_all(&packet.to_bytes()).unwrap();
        }
        stream.flush().unwrap();
        stream
    })
}

fn pose(x: f32, y: f32, z: f32) -> Block {
    Block::Pose {
        orientation: Quat::new(0.0, 0.0, 0.0, 1.0),
        position: Vec3::new(x, y, z),
    }
}

fn full_frame() -> Packet {
    Packet::container_of(&[
        Block::FrameInfo {
            timestamp: 42.5,
            tracking_successful: true,
        },
        Block::Pose {
            orientation: Quat::new(0.1, 0.2, 0.3, 0.9),
            position: Vec3::new(12.0, -30.0, 550.0),
        },
        Block::Blendshapes((0..46).map(|i| i as f32 / 100.0).collect()),
        Block::Eyes {
            left: EyeAngles::new(5.0, -10.0),
            right: EyeAngles::new(6.0, -11.0),
        },
        Block::Markers(vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]),
    ])
}

// ── Connect & decode ─────────────────────────────────────────────

#[test]
fn test_receives_every_block_kind() {
    let (listener, addr) = ephemeral_listener();
    let server = serve_once(listener, vec![full_frame()]);

    let tracker = FaceTracker::new();
    let peer = tracker
        .connect(&addr.ip().to_string(), &addr.port().to_string())
        .unwrap();
    assert_eq!(peer, addr);
    assert!(tracker.is_connected());

    assert!(wait_until(|| tracker.markers().len() == 2));
    assert_eq!(tracker.timestamp(), 42.5);
    assert!(tracker.is_tracking_successful());
    assert_eq!(tracker.rotation(), Quat::new(0.1, 0.2, 0.3, 0.9));
    assert_eq!(tracker.position(), Vec3::new(12.0, -30.0, 550.0));
    assert_eq!(tracker.num_blendshapes(), 46);
    assert_eq!(tracker.blendshape_weight(45), Some(0.45));
    assert_eq!(tracker.left_eye_angles(), EyeAngles::new(5.0, -10.0));
    assert_eq!(tracker.right_eye_angles(), EyeAngles::new(6.0, -11.0));
    assert_eq!(tracker.markers()[1], Vec3::new(4.0, 5.0, 6.0));

    drop(server.join().unwrap());
}

#[test]
fn test_falls_back_to_second_endpoint() {
    let dead = refused_addr();
    let (listener, live) = ephemeral_listener();
    let server = serve_once(listener, vec![Packet::container_of(&[pose(7.0, 8.0, 9.0)])]);

    let tracker = FaceTracker::new();
    let peer = tracker.connect_addrs(vec![dead, live]).unwrap();
    assert_eq!(peer, live);
    assert!(wait_until(|| tracker.position() == Vec3::new(7.0, 8.0, 9.0)));

    drop(server.join().unwrap());
}

#[test]
fn test_all_endpoints_refused() {
    let tracker = FaceTracker::new();
    let err = tracker
        .connect_addrs(vec![refused_addr(), refused_addr()])
        .unwrap_err();
    assert!(matches!(
        err,
        FaceLinkError::AllEndpointsFailed { attempted: 2, .. }
    ));
    assert!(tracker.phase().is_disconnected());
}

#[test]
fn test_unknown_block_does_not_break_container() {
    let (listener, addr) = ephemeral_listener();
    let container = Packet::container(&[
        Packet::new(999, 1, vec![0x5A; 8]),
        Packet::from_block(&pose(1.5, 2.5, 3.5)),
    ]);
    let server = serve_once(listener, vec![container]);

    let tracker = FaceTracker::new();
    tracker.connect_addrs(vec![addr]).unwrap();
    assert!(wait_until(|| tracker.position() == Vec3::new(1.5, 2.5, 3.5)));

    drop(server.join().unwrap());
}

#[test]
fn test_blendshape_count_shrinks_between_frames() {
    let (listener, addr) = ephemeral_listener();
    let first: Vec<f32> = vec![0.9; 46];
    let second: Vec<f32> = (0..10).map(|i| i as f32 * 0.05).collect();
    let server = serve_once(
        listener,
        vec![
            Packet::container_of(&[Block::Blendshapes(first)]),
            Packet::container_of(&[
                Block::Blendshapes(second.clone()),
                Block::FrameInfo {
                    timestamp: 2.0,
                    tracking_successful: true,
                },
            ]),
        ],
    );

    let tracker = FaceTracker::new();
    tracker.connect_addrs(vec![addr]).unwrap();
    assert!(wait_until(|| tracker.timestamp() == 2.0));
    assert_eq!(tracker.num_blendshapes(), 10);
    for (i, w) in second.iter().enumerate() {
        assert_eq!(tracker.blendshape_weight(i), Some(*w));
    }

    drop(server.join().unwrap());
}

#[test]
fn test_byte_at_a_time_delivery() {
    let (listener, addr) = ephemeral_listener();
    let bytes = full_frame().to_bytes();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_nodelay(true).unwrap();
        for b in bytes {
            stream.write_all(&[b]).unwrap();
            stream.flush().unwrap();
        }
        stream
    });

    let tracker = FaceTracker::new();
    tracker.connect_addrs(vec![addr]).unwrap();
    assert!(wait_until(|| tracker.markers().len() == 2));
    assert_eq!(tracker.position(), Vec3::new(12.0, -30.0, 550.0));

    drop(server.join().unwrap());
}

#[test]
fn test_malformed_container_is_dropped_not_fatal() {
    let (listener, addr) = ephemeral_listener();
    let mut bad = Packet::container_of(&[pose(1.0, 1.0, 1.0)]).payload().to_vec();
    bad[0] = 3; // claims three blocks, holds one
    let server = serve_once(
        listener,
        vec![
            Packet::new(33433, 1, bad),
            Packet::container_of(&[pose(2.0, 2.0, 2.0)]),
        ],
    );

    let tracker = FaceTracker::new();
    tracker.connect_addrs(vec![addr]).unwrap();
    assert!(wait_until(|| tracker.position() == Vec3::new(2.0, 2.0, 2.0)));
    assert!(tracker.is_connected());

    drop(server.join().unwrap());
}

// ── Lifecycle ────────────────────────────────────────────────────

#[test]
fn test_peer_close_freezes_state_and_allows_reconnect() {
    let (listener, addr) = ephemeral_listener();
    let server = serve_once(listener, vec![Packet::container_of(&[pose(3.0, 0.0, 0.0)])]);

    let tracker = FaceTracker::new();
    tracker.connect_addrs(vec![addr]).unwrap();
    assert!(wait_until(|| tracker.position().x == 3.0));

    drop(server.join().unwrap());
    assert!(wait_until(|| tracker.phase().is_disconnected()));
    assert_eq!(tracker.position(), Vec3::new(3.0, 0.0, 0.0));

    let (listener, addr) = ephemeral_listener();
    let server = serve_once(listener, vec![Packet::container_of(&[pose(4.0, 0.0, 0.0)])]);
    tracker.connect_addrs(vec![addr]).unwrap();
    assert!(wait_until(|| tracker.position().x == 4.0));

    drop(server.join().unwrap());
}

#[test]
fn test_second_connect_is_rejected_while_connected() {
    let (listener, addr) = ephemeral_listener();
    let server = serve_once(listener, Vec::new());

    let tracker = FaceTracker::new();
    tracker.connect_addrs(vec![addr]).unwrap();
    let err = tracker.connect_addrs(vec![addr]).unwrap_err();
    assert!(matches!(err, FaceLinkError::AlreadyConnected(_)));

    drop(server.join().unwrap());
}

#[test]
fn test_close_shuts_the_socket() {
    let (listener, addr) = ephemeral_listener();
    let server = serve_once(listener, Vec::new());

    let tracker = FaceTracker::new();
    tracker.connect_addrs(vec![addr]).unwrap();
    let mut server_side = server.join().unwrap();

    tracker.close();
    tracker.close();
    assert!(wait_until(|| tracker.phase().is_disconnected()));

    server_side.set_read_timeout(Some(WAIT)).unwrap();
    let mut buf = [0u8; 1];
    let n = server_side.read(&mut buf).unwrap();
    assert_eq!(n, 0, "client socket should be closed");
}

#[test]
fn test_close_from_another_thread_unblocks_connect() {
    // TEST-NET-1: either unroutable (connect hangs until cancelled) or
    // rejected outright, depending on the host's network setup.
    let blackhole: SocketAddr = "192.0.2.1:33433".parse().unwrap();
    let tracker = Arc::new(FaceTracker::with_options(ClientOptions {
        connect_timeout: Duration::from_secs(60),
        ..Default::default()
    }));

    let closer = {
        let tracker = Arc::clone(&tracker);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            tracker.close();
        })
    };

    let started = Instant::now();
    let result = tracker.connect_addrs(vec![blackhole]);
    closer.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(matches!(
        result,
        Err(FaceLinkError::Cancelled) | Err(FaceLinkError::AllEndpointsFailed { .. })
    ));
    assert!(tracker.phase().is_disconnected());
}

#[test]
fn test_drop_while_streaming_does_not_hang() {
    for round in 0..10 {
        let (listener, addr) = ephemeral_listener();
        let stop = Arc::new(AtomicBool::new(false));
        let server = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let (mut stream, _) = listener.accept().unwrap();
                let mut i = 0.0f32;
                while !stop.load(Ordering::SeqCst) {
                    let packet = Packet::container_of(&[pose(i, i, i)]);
                    if stream.write_all(&packet.to_bytes()).is_err() {
                        break;
                    }
                    i += 1.0;
                }
            })
        };

        let tracker = FaceTracker::new();
        tracker.connect_addrs(vec![addr]).unwrap();
        assert!(wait_until(|| tracker.position().x > 0.0));

        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            drop(tracker);
            let _ = done_tx.send(());
        });
        assert!(
            done_rx.recv_timeout(WAIT).is_ok(),
            "drop did not return in round {round}"
        );

        stop.store(true, Ordering::SeqCst);
        server.join().unwrap();
    }
}

#[test]
fn test_readers_see_whole_values_while_streaming() {
    let (listener, addr) = ephemeral_listener();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        for i in 1..=2_000u32 {
            let v = i as f32;
            let packet = Packet::container_of(&[
                pose(v, v, v),
                Block::Blendshapes(vec![v; (i % 46 + 1) as usize]),
            ]);
            stream.write_all(&packet.to_bytes()).unwrap();
        }
        stream
    });

    let tracker = Arc::new(FaceTracker::new());
    tracker.connect_addrs(vec![addr]).unwrap();

    let reader = {
        let tracker = Arc::clone(&tracker);
        thread::spawn(move || {
            while tracker.position().x < 2_000.0 {
                let p = tracker.position();
                assert!(p.x == p.y && p.y == p.z, "torn position {p:?}");
                let w = tracker.blendshape_weights();
                assert!(w.windows(2).all(|pair| pair[0] == pair[1]));
            }
        })
    };

    assert!(wait_until(|| tracker.position().x == 2_000.0));
    reader.join().unwrap();
    drop(server.join().unwrap());
}
