use crate::huffman::CanonicalHuffman;
use std::sync::OnceLock;

/// The `(symbol, code_length)` pairs that seed the process-wide static
/// decoder (§4.3). Order matters: [`CanonicalHuffman::build`] assigns
/// shorter codes to symbols that appear later within a length group, so
/// this exact ordering is part of the format.
#[rustfmt::skip]
pub(crate) const STATIC_PAIRS: [(u16, u8); 249] = [
    (0, 3), (1, 3), (2, 4), (3, 4), (4, 5), (5, 5), (6, 5),
    (7, 5), (8, 5), (9, 5), (10, 5), (11, 6), (12, 7), (13, 7),
    (14, 7), (15, 7), (16, 7), (17, 7), (18, 7), (19, 7), (20, 7),
    (21, 7), (22, 7), (23, 7), (24, 7), (25, 7), (26, 7), (27, 7),
    (28, 8), (29, 8), (30, 8), (31, 8), (32, 8), (33, 8), (34, 8),
    (35, 8), (36, 8), (37, 8), (38, 8), (39, 8), (40, 8), (41, 8),
    (42, 8), (43, 8), (44, 8), (45, 8), (46, 8), (47, 8), (48, 8),
    (49, 8), (50, 8), (51, 8), (52, 8), (53, 8), (54, 8), (55, 8),
    (56, 8), (57, 8), (58, 8), (59, 8), (60, 8), (61, 8), (62, 8),
    (63, 8), (64, 8), (65, 8), (66, 9), (67, 9), (68, 9), (69, 9),
    (70, 9), (71, 9), (72, 9), (73, 9), (74, 9), (75, 9), (76, 9),
    (77, 9), (78, 9), (79, 9), (80, 9), (81, 9), (82, 9), (83, 9),
    (84, 9), (85, 9), (86, 9), (87, 9), (88, 9), (89, 9), (90, 9),
    (91, 9), (92, 9), (93, 9), (94, 9), (95, 9), (96, 9), (97, 9),
    (98, 9), (99, 9), (100, 9), (101, 9), (102, 9), (103, 10), (104, 10),
    (105, 10), (106, 10), (107, 10), (108, 10), (109, 10), (110, 10), (111, 10),
    (112, 10), (113, 10), (114, 10), (115, 10), (116, 10), (117, 10), (118, 10),
    (119, 10), (120, 10), (121, 10), (122, 10), (123, 10), (124, 10), (125, 10),
    (126, 11), (127, 11), (128, 11), (129, 11), (130, 11), (131, 11), (132, 11),
    (133, 11), (134, 11), (135, 11), (136, 11), (137, 11), (138, 11), (139, 11),
    (140, 11), (141, 11), (142, 11), (143, 11), (144, 11), (145, 11), (146, 11),
    (147, 11), (148, 11), (149, 11), (150, 11), (151, 11), (152, 11), (153, 12),
    (154, 12), (155, 12), (156, 12), (157, 12), (158, 12), (159, 12), (160, 12),
    (161, 12), (162, 12), (163, 12), (164, 12), (165, 12), (166, 12), (167, 12),
    (168, 12), (169, 12), (170, 12), (171, 12), (172, 12), (173, 12), (174, 12),
    (175, 12), (176, 12), (177, 12), (178, 12), (179, 12), (180, 12), (181, 13),
    (182, 13), (183, 13), (184, 13), (185, 13), (186, 13), (187, 13), (188, 13),
    (189, 14), (190, 14), (191, 14), (192, 15), (193, 15), (194, 15), (195, 15),
    (196, 15), (197, 15), (198, 15), (199, 15), (200, 15), (201, 15), (202, 15),
    (203, 15), (204, 15), (205, 15), (206, 15), (207, 15), (208, 15), (209, 15),
    (210, 15), (211, 15), (212, 15), (213, 15), (214, 15), (215, 15), (216, 15),
    (217, 15), (218, 15), (219, 16), (220, 16), (221, 16), (222, 16), (223, 16),
    (224, 16), (225, 16), (226, 16), (227, 16), (228, 16), (229, 16), (230, 16),
    (231, 16), (232, 16), (233, 16), (234, 16), (235, 16), (236, 16), (237, 16),
    (238, 16), (239, 16), (240, 16), (241, 16), (242, 16), (243, 16), (244, 16),
    (245, 16), (246, 16), (247, 16), (248, 16),
];

static STATIC_DECODER: OnceLock<CanonicalHuffman> = OnceLock::new();

/// Returns the process-lifetime static Huffman decoder (§4.3), building it
/// on first use. Safe to call concurrently: [`OnceLock`] serializes the
/// one-time construction so racing first callers never build it twice.
pub(crate) fn static_decoder() -> &'static CanonicalHuffman {
    STATIC_DECODER.get_or_init(|| {
        CanonicalHuffman::build(&STATIC_PAIRS).expect("static table is a fixed, valid literal")
    })
}
