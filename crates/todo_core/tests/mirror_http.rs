use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use todo_core::db::open_db_in_memory;
use todo_core::{
    HttpMirrorTransport, MirrorConfig, MirrorError, MirrorPayload, MirrorTransport,
    SqliteTaskRepository, TaskMirror, TaskStore,
};

struct ChannelTransport {
    sent: Mutex<mpsc::Sender<MirrorPayload>>,
}

impl MirrorTransport for ChannelTransport {
    fn post(&self, payload: &MirrorPayload) -> Result<u16, MirrorError> {
        self.sent
            .lock()
            .unwrap()
            .send(payload.clone())
            .map_err(|err| MirrorError::Transport(err.to_string()))?;
        Ok(201)
    }
}

#[test]
fn mirror_posts_only_created_tasks() {
    let (tx, rx) = mpsc::channel();
    let transport = Arc::new(ChannelTransport {
        sent: Mutex::new(tx),
    });
    let conn = open_db_in_memory().unwrap();
    let mut store = TaskStore::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let mirror = TaskMirror::new(transport);
    let in_flight = mirror.in_flight();
    store.subscribe(mirror);

    let task = store.create_task("  Mirror me ").unwrap();
    store.toggle_task(task.id);
    store.delete_task(task.id);
    store.create_task("   ");
    in_flight.wait();

    let payload = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        payload,
        MirrorPayload {
            title: "Mirror me".to_string(),
            completed: false,
        }
    );
    assert!(rx.try_recv().is_err());
    assert_eq!(store.task_list(todo_core::TaskFilter::All), Vec::new());
}

#[test]
fn http_transport_posts_json_to_rest_todos() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}/api", listener.local_addr().unwrap());

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut content_length = 0usize;
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            if header == "\r\n" {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).unwrap();

        let mut stream = reader.into_inner();
        stream
            .write_all(b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .unwrap();
        (request_line, String::from_utf8(body).unwrap())
    });

    let config = MirrorConfig::new(&base_url, Some(5_000)).unwrap();
    let transport = HttpMirrorTransport::new(&config);
    let status = transport
        .post(&MirrorPayload {
            title: "Walk dog".to_string(),
            completed: false,
        })
        .unwrap();
    assert_eq!(status, 201);

    let (request_line, body) = server.join().unwrap();
    assert!(request_line.starts_with("POST /api/rest/todos "));
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json, serde_json::json!({"title": "Walk dog", "completed": false}));
}

#[test]
fn http_transport_reports_unreachable_endpoint() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = MirrorConfig::new(&format!("http://{addr}"), Some(1_000)).unwrap();
    let err = HttpMirrorTransport::new(&config)
        .post(&MirrorPayload {
            title: "x".to_string(),
            completed: true,
        })
        .unwrap_err();
    assert!(matches!(err, MirrorError::Transport(_)));
}
