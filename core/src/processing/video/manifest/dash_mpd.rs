use super::quoted_attribute;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpdSegment {
    pub is_init: bool,
    /// index of the enclosing AdaptationSet
    pub stream_id: i32,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpdManifest {
    /// the MPD with segment lines stripped, kept as rendition metadata
    pub metadata: String,
    pub segments: Vec<MpdSegment>,
}

/// Splits a SegmentList form MPD into segment records and the non-segment
/// skeleton. The stream id counter starts at -1 so the first
/// `<AdaptationSet` opens stream 0.
pub fn parse(text: &str) -> MpdManifest {
    let mut stream_id: i32 = -1;
    let mut metadata = String::new();
    let mut segments = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.contains("<AdaptationSet") {
            stream_id += 1;
        }
        if trimmed.contains("<SegmentURL") {
            if let Some(media) = quoted_attribute(trimmed, "media") {
                segments.push(MpdSegment {
                    is_init: false,
                    stream_id,
                    file_name: media,
                });
            }
            continue;
        }
        if trimmed.contains("<Initialization") {
            if let Some(source_url) = quoted_attribute(trimmed, "sourceURL") {
                segments.push(MpdSegment {
                    is_init: true,
                    stream_id,
                    file_name: source_url,
                });
            }
            continue;
        }
        metadata.push_str(line);
        metadata.push('\n');
    }
    MpdManifest { metadata, segments }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const MPD: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static" mediaPresentationDuration="PT26.2S">
	<Period id="0" start="PT0.0S">
		<AdaptationSet id="0" contentType="video" segmentAlignment="true">
			<Representation id="0" mimeType="video/mp4" codecs="avc1.64001f" width="1024" height="576">
				<SegmentList timescale="1000000" duration="10000000">
					<Initialization sourceURL="init-stream0.m4s"/>
					<SegmentURL media="chunk-stream0-00001.m4s"/>
					<SegmentURL media="chunk-stream0-00002.m4s"/>
					<SegmentURL media="chunk-stream0-00003.m4s"/>
				</SegmentList>
			</Representation>
		</AdaptationSet>
		<AdaptationSet id="1" contentType="audio" segmentAlignment="true">
			<Representation id="1" mimeType="audio/mp4" codecs="mp4a.40.2" audioSamplingRate="48000">
				<SegmentList timescale="1000000" duration="10000000">
					<Initialization sourceURL="init-stream1.m4s"/>
					<SegmentURL media="chunk-stream1-00001.m4s"/>
					<SegmentURL media="chunk-stream1-00002.m4s"/>
					<SegmentURL media="chunk-stream1-00003.m4s"/>
				</SegmentList>
			</Representation>
		</AdaptationSet>
	</Period>
</MPD>
"#;

    #[test]
    fn two_adaptation_sets_yield_eight_segments() {
        let parsed = parse(MPD);
        assert_eq!(parsed.segments.len(), 8);
        let stream_ids: Vec<i32> = parsed.segments.iter().map(|s| s.stream_id).collect();
        assert_eq!(stream_ids, vec![0, 0, 0, 0, 1, 1, 1, 1]);
        let init_flags: Vec<bool> = parsed.segments.iter().map(|s| s.is_init).collect();
        assert_eq!(
            init_flags,
            vec![true, false, false, false, true, false, false, false]
        );
        assert_eq!(parsed.segments[0].file_name, "init-stream0.m4s");
        assert_eq!(parsed.segments[7].file_name, "chunk-stream1-00003.m4s");
    }

    #[test]
    fn metadata_keeps_the_non_segment_skeleton() {
        let parsed = parse(MPD);
        assert!(parsed.metadata.contains("<AdaptationSet id=\"0\""));
        assert!(parsed.metadata.contains("<Representation id=\"1\""));
        assert!(!parsed.metadata.contains("SegmentURL"));
        assert!(!parsed.metadata.contains("Initialization sourceURL"));
    }

    #[test]
    fn two_parses_of_one_manifest_agree() {
        // segment rows are a pure function of manifest content, a re-run
        // of ingestion over the same file must produce the same records
        assert_eq!(parse(MPD).segments, parse(MPD).segments);
    }
}
