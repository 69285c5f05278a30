// Metrics placeholder for the Mercado Pago provider.
// If a metrics infrastructure lands later, swap the no-op with real counters.

#[macro_export]
macro_rules! mp_counter_inc {
    ($name:expr $(, $key:expr => $val:expr )* $(,)?) => {
        // no-op placeholder
        let _ = ($name $(, $key, $val )*);
    };
}
