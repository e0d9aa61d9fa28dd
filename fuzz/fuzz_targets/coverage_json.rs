#![no_main]

use libfuzzer_sys::fuzz_target;
use pinpoint::coverage_store::{canonical_test_id, CoverageData, CoverageStore};
use pinpoint::engine::localize;
use pinpoint::outcomes::OutcomeIndex;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Context parsing must never panic
        let _ = canonical_test_id(input);

        // Neither must loading and ranking arbitrary coverage JSON
        if let Ok(store) = CoverageData::from_json_str(input) {
            let ids: Vec<String> = store
                .measured_files()
                .iter()
                .filter_map(|f| store.contexts_by_line(f))
                .flat_map(|m| m.values().flatten())
                .filter_map(|c| canonical_test_id(c).map(str::to_string))
                .collect();
            let (failed, passed) = ids.split_at(ids.len() / 2);
            let mut outcomes = OutcomeIndex::from_ids(failed.to_vec(), passed.to_vec());
            let _ = localize(&store, &mut outcomes);
        }
    }
});
