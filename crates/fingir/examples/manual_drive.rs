//! Drive a fake request end to end, printing each observed event.

use fingir::{EventKind, FakeRequest, FingirResult};

fn main() -> FingirResult<()> {
    let request = FakeRequest::new();

    request.add_event_listener(EventKind::ReadyStateChange, |event| {
        let target = event.target().as_request().unwrap();
        println!(
            "readystatechange -> {:?} (text so far: {:?})",
            target.ready_state(),
            target.response_text()
        );
    });
    request.add_event_listener(EventKind::LoadEnd, |event| {
        println!(
            "loadend -> loaded={} total={} computable={}",
            event.loaded(),
            event.total(),
            event.length_computable()
        );
    });

    request.open("GET", "/greeting");
    request.set_chunk_size(Some(6));
    request.send(None)?;
    request.respond(200, &[("Content-Type", "text/plain")], "hello from fingir")?;

    println!("status: {} {}", request.status(), request.status_text());
    println!("body:   {}", request.response_text());
    Ok(())
}
