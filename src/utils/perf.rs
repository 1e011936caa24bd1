#[macro_export]
macro_rules! trace_time {
    // $threshold_millis: Enter 500 for 0.5s, 1000 for 1s, etc.
    ($name:expr, $threshold_millis:expr, $block:block) => {{
        let start = std::time::Instant::now();
        let result = $block;
        let millis = start.elapsed().as_millis();
        if millis > $threshold_millis {
            log::warn!(
                "SLOW: '{}' took {}ms (threshold: {}ms)",
                $name,
                millis,
                $threshold_millis
            );
        }
        result
    }};
}
