use maestro_chess_engine::{
    format_move, parse_move, tables, BasicRules, BitboardMoveGenerator, BitboardSet, Board,
    Color, Direction, Move, PieceKind, Position, RulesEngine, SlidingPiece, Square,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const POSITION_5: &str = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";

fn is_castle_or_en_passant(board: &Board, mv: &Move) -> bool {
    match board.piece_at(mv.from) {
        Some((_, PieceKind::King)) => mv.from.col.abs_diff(mv.to.col) == 2,
        Some((_, PieceKind::Pawn)) => mv.from.col != mv.to.col && board.is_empty(mv.to),
        _ => false,
    }
}

#[test]
fn test_legal_moves_come_from_pseudo_legal_set() {
    let generator = BitboardMoveGenerator::new();
    for fen in [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        KIWIPETE,
        POSITION_5,
    ] {
        let position = Position::from_fen(fen).unwrap();
        let pseudo = generator.pseudo_legal_moves(&position.board, position.side_to_move);
        let rules = BasicRules::from_position(position);
        for mv in rules.legal_moves() {
            if is_castle_or_en_passant(&position.board, &mv) {
                continue;
            }
            assert!(
                pseudo.iter().any(|p| p.same_squares(&mv)),
                "{mv} missing from pseudo-legal moves of {fen}"
            );
        }
    }
}

#[test]
fn test_captures_land_on_attacked_enemy_pieces() {
    let generator = BitboardMoveGenerator::new();
    let position = Position::from_fen(KIWIPETE).unwrap();
    for color in [Color::White, Color::Black] {
        let moves = generator.pseudo_legal_moves(&position.board, color);
        let captures: Vec<&Move> = moves.iter().filter(|m| m.is_capture()).collect();
        assert!(!captures.is_empty());
        for mv in captures {
            let (victim, _) = position.board.piece_at(mv.to).unwrap();
            assert_eq!(victim, !color);
            assert!(generator.is_square_attacked(&position.board, mv.to, color));
        }
        for mv in moves.iter().filter(|m| !m.is_capture()) {
            assert!(position.board.is_empty(mv.to));
        }
    }
}

#[test]
fn test_bitboards_stay_consistent_along_playout() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut rules = BasicRules::new();
    for _ in 0..80 {
        let board = rules.board_state();
        let set = BitboardSet::from_board(&board);
        assert!(set.is_consistent());
        assert_eq!(set.occupied.count_ones() as usize, board.pieces().count());

        let moves = rules.legal_moves();
        let Some(&mv) = moves.choose(&mut rng) else {
            break;
        };
        rules.apply_legal_move(mv);
    }
}

#[test]
fn test_empty_board_sliding_attacks_equal_rays() {
    let generator = BitboardMoveGenerator::new();
    for index in 0..64 {
        let square = Square::from_index(index);
        let rook = Direction::ROOK
            .iter()
            .fold(0, |acc, &d| acc | tables().ray(square, d));
        let bishop = Direction::BISHOP
            .iter()
            .fold(0, |acc, &d| acc | tables().ray(square, d));
        assert_eq!(generator.sliding_attacks(square, 0, SlidingPiece::Rook), rook);
        assert_eq!(generator.sliding_attacks(square, 0, SlidingPiece::Bishop), bishop);
        assert_eq!(
            generator.sliding_attacks(square, 0, SlidingPiece::Queen),
            rook | bishop
        );
        assert_eq!((rook | bishop).count_ones() as usize, queen_reach(square));
    }
}

fn queen_reach(square: Square) -> usize {
    let (row, col) = (square.row as i8, square.col as i8);
    let mut count = 0;
    for (dr, dc) in [(0, 1), (0, -1), (1, 0), (-1, 0), (1, 1), (1, -1), (-1, 1), (-1, -1)] {
        let (mut r, mut c) = (row + dr, col + dc);
        while (0..8).contains(&r) && (0..8).contains(&c) {
            count += 1;
            r += dr;
            c += dc;
        }
    }
    count
}

#[test]
fn test_notation_round_trip_over_legal_moves() {
    let rules = BasicRules::from_position(Position::from_fen(POSITION_5).unwrap());
    let moves = rules.legal_moves();
    assert!(moves.iter().any(|m| m.promotion == Some(PieceKind::Knight)));
    for mv in moves {
        let text = format_move(&mv);
        let parsed = parse_move(&text).unwrap();
        assert!(parsed.same_squares(&mv));
        assert_eq!(parsed.promotion, mv.promotion);
        assert_eq!(parsed.to_string(), text);
    }
}

#[test]
fn test_perft_through_public_api() {
    let rules = BasicRules::from_position(Position::from_fen(KIWIPETE).unwrap());
    assert_eq!(rules.perft(1), 48);
    assert_eq!(rules.perft(2), 2039);

    let rules = BasicRules::from_position(Position::from_fen(POSITION_5).unwrap());
    assert_eq!(rules.perft(1), 44);
    assert_eq!(rules.perft(2), 1486);
}
