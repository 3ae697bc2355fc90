diesel::table! {
    Video (video_id) {
        video_id -> BigInt,
        bucket_id -> BigInt,
        file_id -> BigInt,
        size -> BigInt,
        duration -> Nullable<Double>,
        width -> Nullable<Integer>,
        height -> Nullable<Integer>,
        video_codec_name -> Nullable<Text>,
        video_framerate -> Nullable<Text>,
        video_bitrate -> Nullable<BigInt>,
        audio_codec_name -> Nullable<Text>,
        audio_bitrate -> Nullable<BigInt>,
        audio_sample_rate -> Nullable<BigInt>,
    }
}

diesel::table! {
    Profile (profile_id) {
        profile_id -> BigInt,
        name -> Text,
        video_bitrate -> BigInt,
        audio_bitrate -> BigInt,
        width -> Integer,
        height -> Integer,
        protocol -> Text,
    }
}

diesel::table! {
    Rendition (rendition_id) {
        rendition_id -> BigInt,
        video_id -> BigInt,
        profile_id -> BigInt,
        name -> Text,
        protocol -> Text,
        status -> Text,
        progress -> Integer,
        started_at -> BigInt,
        ended_at -> Nullable<BigInt>,
        path -> Nullable<Text>,
        metadata -> Nullable<Text>,
        target_duration -> Nullable<Integer>,
        error_code -> Nullable<Integer>,
        error_message -> Nullable<Text>,
    }
}

diesel::table! {
    RenditionSegment (segment_id) {
        segment_id -> BigInt,
        rendition_id -> BigInt,
        stream_id -> Integer,
        file_name -> Text,
        path -> Text,
        duration -> Nullable<Double>,
        is_init -> Integer,
    }
}

diesel::table! {
    Subtitle (subtitle_id) {
        subtitle_id -> BigInt,
        video_id -> BigInt,
        bucket_id -> BigInt,
        file_id -> BigInt,
        name -> Text,
        code -> Text,
        is_default -> Integer,
        status -> Text,
        path -> Nullable<Text>,
        target_duration -> Nullable<Integer>,
    }
}

diesel::table! {
    SubtitleSegment (subtitle_segment_id) {
        subtitle_segment_id -> BigInt,
        subtitle_id -> BigInt,
        file_name -> Text,
        path -> Text,
        duration -> Double,
    }
}

diesel::table! {
    StoredFile (stored_file_id) {
        stored_file_id -> BigInt,
        bucket_id -> BigInt,
        path -> Text,
        mime_type -> Text,
        size -> BigInt,
        compression -> Text,
        cipher_name -> Nullable<Text>,
        cipher_key_version -> Nullable<Integer>,
        cipher_iv -> Nullable<Text>,
        cipher_tag -> Nullable<Text>,
    }
}

diesel::table! {
    TranscodeJob (job_id) {
        job_id -> BigInt,
        payload -> Text,
        status -> Text,
        created_at -> BigInt,
        started_at -> Nullable<BigInt>,
        finished_at -> Nullable<BigInt>,
        error -> Nullable<Text>,
    }
}

diesel::joinable!(Rendition -> Video (video_id));
diesel::joinable!(Rendition -> Profile (profile_id));
diesel::joinable!(RenditionSegment -> Rendition (rendition_id));
diesel::joinable!(Subtitle -> Video (video_id));
diesel::joinable!(SubtitleSegment -> Subtitle (subtitle_id));

diesel::allow_tables_to_appear_in_same_query!(
    Video,
    Profile,
    Rendition,
    RenditionSegment,
    Subtitle,
    SubtitleSegment,
    StoredFile,
    TranscodeJob,
);
