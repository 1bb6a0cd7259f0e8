//! End-to-end requester/responder behaviour, through the public API only
// (c) 2026 Ross Younger

use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;
use tokio::time::timeout;

use bleft::protocol::header::{WriteData, WritePacing, WriteRequest};
use bleft::protocol::{FLAG_DIRECTORY, OUR_COMPATIBILITY_LEVEL, Status, WireHeader as _};
use bleft::{
    Configuration, DirectoryEntry, DirectoryStore, ErrorKind, FileTransferClient,
    LoopbackTransport, MemoryStore, PacketTransport as _, Responder, Store,
};

const LIMIT: Duration = Duration::from_secs(20);

/// A link with the same packet size in both directions
fn link(packet: usize, empty_reads: usize) -> (LoopbackTransport, LoopbackTransport) {
    let (a, b) = LoopbackTransport::pair(OUR_COMPATIBILITY_LEVEL);
    (
        a.with_packet_lengths(packet, packet)
            .with_empty_reads(empty_reads),
        b.with_packet_lengths(packet, packet)
            .with_empty_reads(empty_reads),
    )
}

/// Runs `body` as the requester against a responder serving `store`, then hands back the store.
///
/// The client is dropped when `body` completes, which ends serving.
async fn session<S, F, Fut, R>(
    store: S,
    (near, mut far): (LoopbackTransport, LoopbackTransport),
    config: Configuration,
    body: F,
) -> (R, S)
where
    S: Store,
    F: FnOnce(FileTransferClient<LoopbackTransport>) -> Fut,
    Fut: Future<Output = R>,
{
    let mut responder = Responder::new(store, config);
    let requester = async move {
        let client = FileTransferClient::connect(near, config).await.unwrap();
        body(client).await
    };
    let (result, served) = timeout(LIMIT, async {
        tokio::join!(requester, responder.serve(&mut far))
    })
    .await
    .expect("session timed out");
    served.unwrap();
    (result, responder.into_store())
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

#[rstest]
#[tokio::test]
async fn round_trip(
    #[values(0, 1, 4000, 10000)] len: usize,
    #[values(20, 185, 512)] packet: usize,
) {
    let contents = pattern(len);
    let expected = contents.clone();
    let (readback, mut store) = session(
        MemoryStore::new(),
        link(packet, 0),
        Configuration::default(),
        |mut client| async move {
            let _ = client.write("/file", &contents, 0, None).await.unwrap();
            client.read("/file", 0).await.unwrap()
        },
    )
    .await;
    assert_eq!(readback, expected);
    assert_eq!(store.read_file("/file").await.unwrap(), expected);
}

#[rstest]
#[case(1, 1)]
#[case(100, 7)]
#[case(7, 100)]
#[case(4000, 4000)]
#[tokio::test]
async fn chunk_sizes_differ(#[case] read_chunk_size: u32, #[case] max_chunk_size: u32) {
    let config = Configuration {
        read_chunk_size,
        max_chunk_size,
    };
    let contents = pattern(777);
    let expected = contents.clone();
    let (readback, _) = session(
        MemoryStore::new(),
        link(64, 0),
        config,
        |mut client| async move {
            let _ = client.write("/f", &contents, 0, None).await.unwrap();
            client.read("/f", 0).await.unwrap()
        },
    )
    .await;
    assert_eq!(readback, expected);
}

#[tokio::test]
async fn write_offsets() {
    let ((), mut store) = session(
        MemoryStore::new(),
        link(512, 0),
        Configuration::default(),
        |mut client| async move {
            let _ = client.write("/f", b"abcdefgh", 0, None).await.unwrap();
            let _ = client.write("/f", b"X", 10, None).await.unwrap();
            assert_eq!(
                client.read("/f", 0).await.unwrap(),
                b"abcdefgh\0\0X".to_vec()
            );
            let _ = client.write("/f", b"YZ", 2, None).await.unwrap();
        },
    )
    .await;
    assert_eq!(store.read_file("/f").await.unwrap(), b"abYZ");
}

#[tokio::test]
async fn partial_reads() {
    let _ = session(
        MemoryStore::new(),
        link(512, 0),
        Configuration::default(),
        |mut client| async move {
            let _ = client.write("/f", b"0123456789", 0, None).await.unwrap();
            assert_eq!(client.read("/f", 4).await.unwrap(), b"456789");
            assert!(client.read("/f", 10).await.unwrap().is_empty());
            let e = client.read("/f", 11).await.unwrap_err();
            assert_eq!(e.kind(), Some(ErrorKind::MissingFile));
            let e = client.read("/nope", 0).await.unwrap_err();
            assert_eq!(e.kind(), Some(ErrorKind::MissingFile));
        },
    )
    .await;
}

#[tokio::test]
async fn modification_times() {
    let store = MemoryStore::new().with_time_resolution(1_000);
    let _ = session(store, link(512, 0), Configuration::default(), |mut client| async move {
        assert_eq!(
            client.write("/f", b"x", 0, Some(123_456_789)).await.unwrap(),
            123_456_000
        );
        assert_eq!(client.mkdir("/d", Some(5_999)).await.unwrap(), 5_000);
        let listing = client.listdir("/").await.unwrap();
        assert_eq!(
            listing,
            vec![
                DirectoryEntry::new("d".into(), 0, FLAG_DIRECTORY, 5_000),
                DirectoryEntry::new("f".into(), 1, 0, 123_456_000),
            ]
        );
    })
    .await;
}

#[tokio::test]
async fn hello_directory() {
    let _ = session(
        MemoryStore::new(),
        link(512, 0),
        Configuration::default(),
        |mut client| async move {
            let _ = client.mkdir("/d/", None).await.unwrap();
            assert!(client.listdir("/d/").await.unwrap().is_empty());
            let _ = client.write("/d/f.txt", b"x", 0, None).await.unwrap();
            let listing = client.listdir("/d/").await.unwrap();
            assert_eq!(listing.len(), 1);
            assert_eq!(listing[0].name, "f.txt");
            assert_eq!(listing[0].file_size, 1);
            assert_eq!(listing[0].flags, 0);
            assert!(!listing[0].is_directory());
        },
    )
    .await;
}

#[tokio::test]
async fn listing_is_complete() {
    let names: Vec<String> = (0..40)
        .map(|i| format!("file-number-{i:03}-with-a-long-enough-name-to-span-packets"))
        .collect();
    let mut store = MemoryStore::new();
    let _ = store.create_directory("/many", 0).await.unwrap();
    for (i, name) in names.iter().enumerate() {
        let _ = store
            .write_file(&format!("/many/{name}"), vec![0; i], 0)
            .await
            .unwrap();
    }
    let (listing, _) = session(store, link(20, 0), Configuration::default(), |mut client| async move {
        client.listdir("/many").await.unwrap()
    })
    .await;
    assert_eq!(listing.len(), names.len());
    let listed: Vec<_> = listing.iter().map(|e| e.name.clone()).collect();
    assert_eq!(listed, names);
    for (i, entry) in listing.iter().enumerate() {
        assert_eq!(entry.file_size as usize, i);
    }
}

#[tokio::test]
async fn delete_rules() {
    let _ = session(
        MemoryStore::new(),
        link(512, 0),
        Configuration::default(),
        |mut client| async move {
            let _ = client.mkdir("/full/empty", None).await.unwrap();
            let _ = client.write("/full/f", b"x", 0, None).await.unwrap();

            let e = client.delete("/full").await.unwrap_err();
            assert_eq!(e.kind(), Some(ErrorKind::MissingFile));
            let e = client.delete("/full/nothing").await.unwrap_err();
            assert_eq!(e.kind(), Some(ErrorKind::MissingFile));

            client.delete("/full/empty").await.unwrap();
            client.delete("/full/f").await.unwrap();
            assert!(client.listdir("/full").await.unwrap().is_empty());
            client.delete("/full").await.unwrap();
            assert!(client.listdir("/").await.unwrap().is_empty());
        },
    )
    .await;
}

#[tokio::test]
async fn moves() {
    let ((), store) = session(
        MemoryStore::new(),
        link(512, 0),
        Configuration::default(),
        |mut client| async move {
            let _ = client.write("/a", b"contents", 0, None).await.unwrap();
            let _ = client.mkdir("/dir", None).await.unwrap();
            client.move_path("/a", "/dir/b").await.unwrap();
            let e = client.move_path("/a", "/c").await.unwrap_err();
            assert_eq!(e.kind(), Some(ErrorKind::MissingFile));
            assert_eq!(client.read("/dir/b", 0).await.unwrap(), b"contents");
        },
    )
    .await;
    assert!(!store.exists("/a"));
    assert!(store.exists("/dir/b"));
}

#[tokio::test]
async fn narrow_link_with_empty_reads() {
    let contents = pattern(300);
    let expected = contents.clone();
    let _ = session(
        MemoryStore::new(),
        link(20, 3),
        Configuration::default(),
        |mut client| async move {
            let _ = client.mkdir("/a/rather/deep/directory/path", None).await.unwrap();
            let _ = client
                .write("/a/rather/deep/directory/path/file.bin", &contents, 0, None)
                .await
                .unwrap();
            assert_eq!(
                client
                    .read("/a/rather/deep/directory/path/file.bin", 0)
                    .await
                    .unwrap(),
                expected
            );
            let listing = client.listdir("/a/rather/deep/directory/path").await.unwrap();
            assert_eq!(listing.len(), 1);
            client
                .move_path(
                    "/a/rather/deep/directory/path/file.bin",
                    "/a/rather/deep/file.bin",
                )
                .await
                .unwrap();
            client.delete("/a/rather/deep/file.bin").await.unwrap();
        },
    )
    .await;
}

#[tokio::test]
async fn asymmetric_packet_sizes() {
    let (a, b) = LoopbackTransport::pair(OUR_COMPATIBILITY_LEVEL);
    let near = a.with_packet_lengths(20, 244);
    let far = b.with_packet_lengths(244, 20);
    let contents = pattern(1000);
    let expected = contents.clone();
    let (readback, _) = session(
        MemoryStore::new(),
        (near, far),
        Configuration::default(),
        |mut client| async move {
            let _ = client.write("/f", &contents, 0, None).await.unwrap();
            client.read("/f", 0).await.unwrap()
        },
    )
    .await;
    assert_eq!(readback, expected);
}

#[tokio::test]
async fn move_needs_version_4() {
    let (a, _b) = LoopbackTransport::pair(OUR_COMPATIBILITY_LEVEL);
    let near = a.with_peer_version(3);
    let sent = near.sent_counter();
    let mut client = FileTransferClient::connect(near, Configuration::default())
        .await
        .unwrap();
    let e = client.move_path("/a", "/b").await.unwrap_err();
    assert_eq!(e.kind(), Some(ErrorKind::UnsupportedByPeer));
    assert_eq!(sent.load(std::sync::atomic::Ordering::Relaxed), 0);
}

#[tokio::test]
async fn version_2_peer_is_refused() {
    let (a, _b) = LoopbackTransport::pair(2);
    let e = FileTransferClient::connect(a, Configuration::default())
        .await
        .unwrap_err();
    assert_eq!(e.kind(), Some(ErrorKind::UnsupportedByPeer));
}

#[tokio::test]
async fn junk_before_requests() {
    let (mut near, far) = link(512, 0);
    near.write_packet(&[0x99, 0x01]).await.unwrap();
    // a poison message arriving after its write has ended
    let poison = WriteData {
        status: Status::ErrorProtocol,
        offset: 0,
        free_space: 0,
    };
    near.write_packet(&poison.encode()).await.unwrap();
    let (contents, _) = session(
        MemoryStore::new(),
        (near, far),
        Configuration::default(),
        |mut client| async move {
            let _ = client.write("/f", b"ok", 0, None).await.unwrap();
            client.read("/f", 0).await.unwrap()
        },
    )
    .await;
    assert_eq!(contents, b"ok");
}

#[tokio::test]
async fn requester_vanishes_mid_write() {
    let (mut near, mut far) = link(512, 0);
    let mut store = MemoryStore::new();
    let _ = store.write_file("/f", b"before".to_vec(), 0).await.unwrap();
    let mut responder = Responder::new(
        store,
        Configuration {
            max_chunk_size: 10,
            ..Configuration::default()
        },
    );

    let requester = async move {
        let request = WriteRequest {
            path_length: 2,
            offset: 0,
            modification_time: 0,
            total_length: 100,
        };
        let mut packet = request.encode();
        packet.extend_from_slice(b"/f");
        near.write_packet(&packet).await.unwrap();
        let mut buf = [0u8; 512];
        let n = near.read_packet_into(&mut buf).await.unwrap();
        let pacing = WritePacing::decode(&buf[..n]).unwrap();
        assert_eq!(pacing.status, Status::Ok);
        assert_eq!(pacing.free_space, 10);
        // and away
    };
    let ((), served) = timeout(LIMIT, async {
        tokio::join!(requester, responder.serve(&mut far))
    })
    .await
    .unwrap();
    served.unwrap();
    let mut store = responder.into_store();
    assert_eq!(store.read_file("/f").await.unwrap(), b"before");
}

#[tokio::test]
async fn directory_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryStore::new(dir.path()).unwrap();
    let contents = pattern(5000);
    let expected = contents.clone();
    let _ = session(store, link(128, 0), Configuration::default(), |mut client| async move {
        let _ = client.mkdir("/sub", None).await.unwrap();
        let _ = client.write("/sub/data", &contents, 0, None).await.unwrap();
        assert_eq!(client.read("/sub/data", 0).await.unwrap(), expected);
        let listing = client.listdir("/").await.unwrap();
        assert_eq!(listing.len(), 1);
        assert!(listing[0].is_directory());
        client.move_path("/sub/data", "/moved").await.unwrap();
        client.delete("/sub").await.unwrap();
        let e = client.read("/sub/data", 0).await.unwrap_err();
        assert_eq!(e.kind(), Some(ErrorKind::MissingFile));
    })
    .await;
    assert_eq!(std::fs::read(dir.path().join("moved")).unwrap(), pattern(5000));
    assert!(!dir.path().join("sub").exists());
}
