//! Record button handling.
//!
//! The button is the only stimulus shared between interrupt context and the
//! sampling loop. Its EXTI line wakes `button_task`, which flips
//! [`RECORD_TOGGLE`]; the loop reads the toggle once per tick. There is no
//! software debouncing, each falling edge counts.

use embassy_stm32::exti::ExtiInput;
use sensor_recorder::toggle::ToggleSignal;

/// Recording requested by the operator (`true` = record).
pub static RECORD_TOGGLE: ToggleSignal = ToggleSignal::new();

/// Async task that flips [`RECORD_TOGGLE`] on every button press.
///
/// # Arguments
///
/// * `button` - EXTI input of the record button (takes ownership)
#[embassy_executor::task]
pub async fn button_task(mut button: ExtiInput<'static>) {
    loop {
        button.wait_for_falling_edge().await;
        let requested = RECORD_TOGGLE.toggle();
        defmt::debug!("Record button pressed, recording requested: {}", requested);
    }
}
