#![no_main]

use libfuzzer_sys::fuzz_target;
use parsec_vdisplay::locale::{LANGUAGES, Localizer};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(text) = std::str::from_utf8(rest) else {
        return;
    };

    let Ok(mut localizer) = Localizer::new(LANGUAGES[usize::from(selector) % LANGUAGES.len()])
    else {
        return;
    };
    // Unknown keys and arbitrary arguments fall back without panicking
    let _ = localizer.translate(text, &[&text, &selector]);
    let _ = localizer.get(text);
    localizer.set_language(text);
});
