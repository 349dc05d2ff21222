use mempool::{Policy, Pool, SegmentInfo};

fn print_layout(label: &str, segments: &[SegmentInfo]) {
    print!("{label}: ");
    for segment in segments {
        let kind = if segment.allocated { "alloc" } else { "gap" };
        print!("[{} {kind}] ", segment.size);
    }
    println!();
}

fn main() {
    env_logger::init();

    let mut pool = Pool::open(1024, Policy::BestFit).unwrap();
    print_layout("fresh", &pool.inspect());

    let greeting = pool.allocate(16).unwrap();
    println!(
        "got {} bytes at offset {}",
        greeting.size(),
        greeting.base()
    );
    pool.bytes_mut(&greeting)
        .unwrap()
        .copy_from_slice(b"hello from pool!");

    let scratch = pool.allocate(256).unwrap();
    print_layout("two allocations", &pool.inspect());

    println!(
        "contents: {}",
        String::from_utf8_lossy(pool.bytes(&greeting).unwrap())
    );

    pool.release(scratch).unwrap();
    pool.release(greeting).unwrap();
    print_layout("all released", &pool.inspect());

    pool.close().map_err(|(_, err)| err).unwrap();
    println!("pool closed");
}
